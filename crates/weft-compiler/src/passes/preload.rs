//! Propagation of the `preload` tag along hard dependencies.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use weft_core::builder::ContainerBuilder;
use weft_core::error::CompileResult;

use crate::passes::analysis::AnalyzeReferencesPass;
use crate::Pass;

const PRELOAD_TAG: &str = "preload";

/// Extends the `preload` tag to everything a preloaded service needs.
///
/// A service the runtime warms up eagerly pulls in its whole eager
/// dependency closure, so the tag follows every non-lazy, non-weak edge.
/// Lazy and weak edges stay untagged.
#[derive(Default)]
pub struct PropagatePreloadTagsPass;

impl PropagatePreloadTagsPass {
    /// Create the pass.
    pub fn new() -> Self {
        Self
    }
}

impl Pass for PropagatePreloadTagsPass {
    fn name(&self) -> &'static str {
        "PropagatePreloadTagsPass"
    }

    fn process(&mut self, builder: &mut ContainerBuilder) -> CompileResult<()> {
        AnalyzeReferencesPass::new().process(builder)?;

        let mut stack: Vec<String> = builder
            .definitions()
            .iter()
            .filter(|(_, def)| def.has_tag(PRELOAD_TAG))
            .map(|(id, _)| id.clone())
            .collect();
        let mut seen: FxHashSet<String> = stack.iter().cloned().collect();

        while let Some(id) = stack.pop() {
            let targets: Vec<String> = builder
                .graph()
                .out_edges(&id)
                .into_iter()
                .filter(|(edge, _)| !edge.lazy && !edge.weak)
                .map(|(_, node)| node.id.clone())
                .collect();
            for target in targets {
                if !seen.insert(target.clone()) {
                    continue;
                }
                let newly_tagged = match builder.definition_mut(&target) {
                    Some(def) if !def.has_tag(PRELOAD_TAG) => {
                        def.add_tag(PRELOAD_TAG, IndexMap::new());
                        true
                    }
                    _ => false,
                };
                if newly_tagged {
                    builder.log(
                        "PropagatePreloadTagsPass",
                        format!("tagged service '{target}' for preloading"),
                    );
                }
                stack.push(target);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::reference::Reference;
    use weft_core::value::{Argument, Value};

    #[test]
    fn tag_reaches_the_eager_closure() {
        let mut builder = ContainerBuilder::new();
        builder.register("store", "Store");
        builder
            .register("repo", "Repo")
            .add_argument(Value::Reference(Reference::new("store")));
        builder
            .register("app", "App")
            .add_argument(Value::Reference(Reference::new("repo")))
            .add_tag(PRELOAD_TAG, IndexMap::new());

        PropagatePreloadTagsPass::new().process(&mut builder).unwrap();

        assert!(builder.definition("repo").unwrap().has_tag(PRELOAD_TAG));
        assert!(builder.definition("store").unwrap().has_tag(PRELOAD_TAG));
    }

    #[test]
    fn lazy_and_weak_edges_stop_the_propagation() {
        let mut builder = ContainerBuilder::new();
        builder.register("deferred", "Deferred");
        builder.register("optional", "Optional");
        builder
            .register("app", "App")
            .add_argument(Value::Argument(Box::new(Argument::lazy(Value::Reference(
                Reference::new("deferred"),
            )))))
            .add_argument(Value::Reference(Reference::with_behavior(
                "optional",
                weft_core::reference::InvalidBehavior::IgnoreOnUninitialized,
            )))
            .add_tag(PRELOAD_TAG, IndexMap::new());

        PropagatePreloadTagsPass::new().process(&mut builder).unwrap();

        assert!(!builder.definition("deferred").unwrap().has_tag(PRELOAD_TAG));
        assert!(!builder.definition("optional").unwrap().has_tag(PRELOAD_TAG));
    }

    #[test]
    fn untagged_roots_propagate_nothing() {
        let mut builder = ContainerBuilder::new();
        builder.register("store", "Store");
        builder
            .register("app", "App")
            .add_argument(Value::Reference(Reference::new("store")));

        PropagatePreloadTagsPass::new().process(&mut builder).unwrap();
        assert!(!builder.definition("store").unwrap().has_tag(PRELOAD_TAG));
    }
}
