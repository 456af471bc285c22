//! Removal of private definitions nothing public reaches.

use rustc_hash::FxHashSet;
use weft_core::builder::ContainerBuilder;
use weft_core::error::CompileResult;

use crate::Pass;

/// Removes private definitions unreachable from the public surface.
///
/// Reachability runs over the freshly analyzed reference graph, rooted at
/// every public definition and public alias. Weak edges are not hard
/// dependencies and are not followed; lazy edges are, since the target is
/// still instantiated eventually.
///
/// Expects the graph produced by a directly preceding analysis run.
#[derive(Default)]
pub struct RemoveUnusedDefinitionsPass;

impl RemoveUnusedDefinitionsPass {
    /// Create the pass.
    pub fn new() -> Self {
        Self
    }
}

impl Pass for RemoveUnusedDefinitionsPass {
    fn name(&self) -> &'static str {
        "RemoveUnusedDefinitionsPass"
    }

    fn process(&mut self, builder: &mut ContainerBuilder) -> CompileResult<()> {
        let mut reachable: FxHashSet<String> = FxHashSet::default();
        let mut stack: Vec<String> = Vec::new();

        for (id, def) in builder.definitions() {
            if def.public {
                stack.push(id.clone());
            }
        }
        for (id, alias) in builder.aliases() {
            if alias.public {
                stack.push(id.clone());
            }
        }

        while let Some(id) = stack.pop() {
            if !reachable.insert(id.clone()) {
                continue;
            }
            for (edge, dest) in builder.graph().out_edges(&id) {
                if edge.weak {
                    continue;
                }
                if !reachable.contains(&dest.id) {
                    stack.push(dest.id.clone());
                }
            }
        }

        let unused: Vec<String> = builder
            .definitions()
            .keys()
            .filter(|id| !reachable.contains(*id))
            .cloned()
            .collect();
        for id in unused {
            builder.remove_definition(&id);
            builder.log(
                "RemoveUnusedDefinitionsPass",
                format!("removed unused service '{id}'"),
            );
        }
        Ok(())
    }
}
