//! Alias-chain flattening and reference rewriting.

use weft_core::builder::{CONTAINER_ID, ContainerBuilder};
use weft_core::error::{CompileError, CompileResult};
use weft_core::value::Value;

use crate::Pass;
use crate::walker::{WalkContext, ValueTransformer, process_definitions, walk_value};

/// Flattens alias chains and rewrites every reference to the terminal id.
///
/// `a -> b -> c` becomes `a -> c`; a chain that revisits an id is a
/// circular-dependency error; a chain ending at an id that is neither a
/// definition nor the container itself is a missing-service error.
/// References and decoration targets pointing at an alias are rewritten to
/// the terminal definition id.
#[derive(Default)]
pub struct ResolveAliasesPass;

impl ResolveAliasesPass {
    /// Create the pass.
    pub fn new() -> Self {
        Self
    }

    fn terminal_id(builder: &ContainerBuilder, start: &str) -> CompileResult<String> {
        let mut path = vec![start.to_string()];
        let mut current = start.to_string();
        while let Some(alias) = builder.alias(&current) {
            current = alias.target.clone();
            if path.contains(&current) {
                path.push(current);
                return Err(CompileError::CircularDependency { path });
            }
            path.push(current.clone());
        }
        if current != CONTAINER_ID && !builder.has_definition(&current) {
            return Err(CompileError::ServiceNotFound {
                id: current,
                source_id: Some(start.to_string()),
            });
        }
        Ok(current)
    }
}

impl ValueTransformer for ResolveAliasesPass {
    fn transform(
        &mut self,
        ctx: &mut WalkContext<'_>,
        value: Value,
        is_root: bool,
    ) -> CompileResult<Value> {
        match value {
            Value::Reference(mut reference) => {
                // Aliases are already flat; one hop reaches the terminal id.
                let target = ctx.builder.resolve_alias(&reference.id);
                if target != reference.id {
                    reference.id = target.to_string();
                }
                walk_value(self, ctx, Value::Reference(reference), false)
            }
            Value::Definition(mut def) => {
                if let Some(decoration) = &mut def.decorates {
                    let target = ctx.builder.resolve_alias(&decoration.id);
                    if target != decoration.id {
                        decoration.id = target.to_string();
                    }
                }
                walk_value(self, ctx, Value::Definition(def), is_root)
            }
            other => walk_value(self, ctx, other, is_root),
        }
    }
}

impl Pass for ResolveAliasesPass {
    fn name(&self) -> &'static str {
        "ResolveAliasesPass"
    }

    fn process(&mut self, builder: &mut ContainerBuilder) -> CompileResult<()> {
        let ids: Vec<String> = builder.aliases().keys().cloned().collect();
        for id in ids {
            let terminal = Self::terminal_id(builder, &id)?;
            if let Some(alias) = builder.aliases_mut().get_mut(&id) {
                alias.target = terminal;
            }
        }
        process_definitions(self, builder)
    }
}
