//! Application of service decorations.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use weft_core::builder::ContainerBuilder;
use weft_core::definition::Alias;
use weft_core::error::{CompileError, CompileResult};
use weft_core::reference::InvalidBehavior;

use crate::Pass;

/// Rewrites decorated services so the decorator takes over the public id.
///
/// Decorations apply highest priority first, so higher priorities wrap
/// closer to the original. For each decoration the decorated definition is
/// renamed to the declared inner id (default `<decorator>.inner`), the
/// original id becomes an alias to the decorator, and the original's
/// visibility moves to that alias. A missing decoration target follows the
/// decoration's on-invalid behavior.
#[derive(Default)]
pub struct DecoratorPass;

impl DecoratorPass {
    /// Create the pass.
    pub fn new() -> Self {
        Self
    }
}

impl Pass for DecoratorPass {
    fn name(&self) -> &'static str {
        "DecoratorPass"
    }

    fn process(&mut self, builder: &mut ContainerBuilder) -> CompileResult<()> {
        // Max-heap on (priority, declaration order): ties apply in
        // registration order.
        let mut queue: BinaryHeap<(i32, Reverse<usize>, String)> = builder
            .definitions()
            .iter()
            .filter(|(_, def)| def.decorates.is_some())
            .enumerate()
            .map(|(order, (id, def))| {
                let priority = def.decorates.as_ref().map_or(0, |d| d.priority);
                (priority, Reverse(order), id.clone())
            })
            .collect();

        while let Some((_, _, id)) = queue.pop() {
            let Some(decoration) = builder
                .definition_mut(&id)
                .and_then(|def| def.decorates.take())
            else {
                continue;
            };
            let inner = decoration.id.clone();
            let renamed = decoration
                .inner_id
                .clone()
                .unwrap_or_else(|| format!("{id}.inner"));

            if let Some(alias) = builder.alias(&inner).cloned() {
                // Decorating an alias: the inner id keeps pointing at
                // whatever the alias pointed at.
                builder.set_alias(&renamed, Alias::new(alias.target.clone()));
                let mut replacement = Alias::new(id.clone());
                replacement.public = alias.public;
                builder.set_alias(&inner, replacement);
            } else if builder.has_definition(&inner) {
                let Some(mut decorated) = builder.remove_definition(&inner) else {
                    continue;
                };
                let public = decorated.public;
                decorated.set_public(false);
                builder.set_definition(&renamed, decorated);
                let mut alias = Alias::new(id.clone());
                alias.public = public;
                builder.set_alias(&inner, alias);
                builder.log(
                    "DecoratorPass",
                    format!("service '{id}' decorates '{inner}' as '{renamed}'"),
                );
            } else {
                match decoration.on_invalid {
                    InvalidBehavior::Ignore => {
                        builder.remove_definition(&id);
                        builder.log(
                            "DecoratorPass",
                            format!("removed decorator '{id}': service '{inner}' does not exist"),
                        );
                    }
                    InvalidBehavior::Null => {}
                    InvalidBehavior::Exception | InvalidBehavior::IgnoreOnUninitialized => {
                        return Err(CompileError::ServiceNotFound {
                            id: inner,
                            source_id: Some(id),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
