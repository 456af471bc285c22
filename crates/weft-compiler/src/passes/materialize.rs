//! Materialization of provisional definitions.

use weft_core::builder::ContainerBuilder;
use weft_core::definition::{Changes, DefinitionKind};
use weft_core::error::{CompileError, CompileResult};

use crate::Pass;

/// Turns `Undefined` definitions into concrete object definitions.
///
/// The class hint is used when one was declared, falling back to the
/// service id. The class must be known to the metadata registry; an
/// unknown class fails with a binding error.
#[derive(Default)]
pub struct ResolveUndefinedDefinitionsPass;

impl ResolveUndefinedDefinitionsPass {
    /// Create the pass.
    pub fn new() -> Self {
        Self
    }
}

impl Pass for ResolveUndefinedDefinitionsPass {
    fn name(&self) -> &'static str {
        "ResolveUndefinedDefinitionsPass"
    }

    fn process(&mut self, builder: &mut ContainerBuilder) -> CompileResult<()> {
        let ids: Vec<String> = builder
            .definitions()
            .iter()
            .filter(|(_, def)| matches!(def.kind, DefinitionKind::Undefined { .. }))
            .map(|(id, _)| id.clone())
            .collect();

        for id in ids {
            let class = {
                let Some(def) = builder.definition(&id) else {
                    continue;
                };
                let DefinitionKind::Undefined { class } = &def.kind else {
                    continue;
                };
                class.clone().unwrap_or_else(|| id.clone())
            };
            if !builder.metadata().contains(&class) {
                return Err(CompileError::BindingResolution {
                    class,
                    reason: format!("cannot materialize service '{id}': class is unknown"),
                });
            }
            if let Some(def) = builder.definition_mut(&id) {
                def.kind = DefinitionKind::Object {
                    class: class.clone(),
                    arguments: Vec::new(),
                };
                def.changes |= Changes::CLASS;
                builder.log(
                    "ResolveUndefinedDefinitionsPass",
                    format!("materialized service '{id}' as '{class}'"),
                );
            }
        }
        Ok(())
    }
}
