//! Iterative fixed-point inlining of single-use definitions.

use rustc_hash::FxHashSet;
use weft_core::builder::{CONTAINER_ID, ContainerBuilder};
use weft_core::definition::{DefinitionKind, FactoryTarget};
use weft_core::error::{CompileError, CompileResult};
use weft_core::value::Value;

use crate::Pass;
use crate::passes::analysis::AnalyzeReferencesPass;
use crate::walker::{WalkContext, ValueTransformer, process_definitions, walk_value};

const NAME: &str = "InlineDefinitionsPass";

/// Splices inlineable definitions into their call sites.
///
/// Each round re-runs dependency analysis restricted to the ids touched in
/// the previous round, walks those definitions, and replaces every reference
/// to an inlineable target with the target definition itself. Rounds repeat
/// until nothing is inlined. Constructed without an analysis sub-pass the
/// pass runs exactly one round over the graph already on the builder.
///
/// Shared targets are spliced as-is; non-shared targets are cloned per call
/// site, with a currently-cloning id set re-detecting cycles the cloning
/// recursion introduces.
pub struct InlineDefinitionsPass {
    analyzer: Option<AnalyzeReferencesPass>,
    only: Option<FxHashSet<String>>,
    connected: FxHashSet<String>,
    round_inlined: FxHashSet<String>,
    cloning: Vec<String>,
    inlined_any: bool,
}

impl Default for InlineDefinitionsPass {
    fn default() -> Self {
        Self::new()
    }
}

impl InlineDefinitionsPass {
    /// Fixed-point inlining with a private analysis sub-pass.
    pub fn new() -> Self {
        InlineDefinitionsPass {
            analyzer: Some(AnalyzeReferencesPass::new()),
            only: None,
            connected: FxHashSet::default(),
            round_inlined: FxHashSet::default(),
            cloning: Vec::new(),
            inlined_any: false,
        }
    }

    /// Single-round inlining over the graph already on the builder.
    pub fn without_analysis() -> Self {
        InlineDefinitionsPass {
            analyzer: None,
            ..InlineDefinitionsPass::new()
        }
    }

    fn inlineable(
        &mut self,
        ctx: &WalkContext<'_>,
        source_id: &str,
        target_id: &str,
    ) -> bool {
        let Some(def) = ctx.builder.definition(target_id) else {
            return false;
        };
        if def.deprecation.is_some() || def.lazy || def.synthetic {
            return false;
        }
        if !ctx.builder.extenders(target_id).is_empty() {
            return false;
        }

        let graph = ctx.builder.graph();
        if !def.shared {
            return graph
                .in_edges(target_id)
                .iter()
                .all(|(edge, _)| !edge.weak && !edge.lazy);
        }

        if def.public || source_id == target_id {
            return false;
        }
        match &def.kind {
            DefinitionKind::Closure { .. } => return false,
            DefinitionKind::Factory {
                target: FactoryTarget::Service(reference),
                ..
            } if reference.id == CONTAINER_ID => return false,
            _ => {}
        }

        self.connected.insert(target_id.to_string());
        if !graph.has_node(target_id) {
            return true;
        }

        let mut sources: FxHashSet<&str> = FxHashSet::default();
        let mut by_constructor = false;
        for (edge, source) in graph.in_edges(target_id) {
            self.connected.insert(source.id.clone());
            if edge.weak || edge.lazy {
                return false;
            }
            by_constructor |= edge.by_constructor;
            sources.insert(source.id.as_str());
        }
        // Multiple referrers defer the target to a later round, when other
        // inlining may have collapsed them.
        if sources.len() != 1 {
            return false;
        }
        if by_constructor
            && let Some(referrer) = ctx.builder.definition(source_id)
            && referrer.lazy
            && !referrer.properties.is_empty()
            && !referrer.calls.is_empty()
        {
            return false;
        }
        true
    }
}

impl ValueTransformer for InlineDefinitionsPass {
    fn transform(
        &mut self,
        ctx: &mut WalkContext<'_>,
        value: Value,
        is_root: bool,
    ) -> CompileResult<Value> {
        if is_root
            && let Some(only) = &self.only
            && !ctx.current_id.as_deref().is_some_and(|id| only.contains(id))
        {
            return Ok(value);
        }
        let Value::Reference(reference) = value else {
            return walk_value(self, ctx, value, is_root);
        };

        let source_id = ctx.current_id.clone().unwrap_or_default();
        let target_id = ctx.builder.resolve_alias(&reference.id).to_string();
        if !self.inlineable(ctx, &source_id, &target_id) {
            return walk_value(self, ctx, Value::Reference(reference), false);
        }

        let Some(def) = ctx.builder.definition(&target_id).cloned() else {
            return walk_value(self, ctx, Value::Reference(reference), false);
        };
        ctx.builder.log(
            NAME,
            format!("inlined service '{target_id}' into '{source_id}'"),
        );
        self.inlined_any = true;
        self.round_inlined.insert(target_id.clone());
        self.connected.insert(source_id);

        if def.shared {
            return Ok(Value::Definition(Box::new(def)));
        }

        // Non-shared targets are cloned per call site; the clone's own tree
        // is inlined in turn, so a reference cycle re-enters here.
        if self.cloning.contains(&target_id) {
            let mut path = self.cloning.clone();
            path.push(target_id.clone());
            return Err(CompileError::CircularDependency { path });
        }
        self.cloning.push(target_id.clone());
        let inlined = self.transform(ctx, Value::Definition(Box::new(def)), false);
        self.cloning.pop();
        inlined
    }
}

impl Pass for InlineDefinitionsPass {
    fn name(&self) -> &'static str {
        NAME
    }

    fn process(&mut self, builder: &mut ContainerBuilder) -> CompileResult<()> {
        self.only = None;
        self.cloning.clear();
        self.inlined_any = false;
        let mut subset: Option<FxHashSet<String>> = None;

        loop {
            self.connected.clear();
            self.round_inlined.clear();
            self.inlined_any = false;

            match (&mut self.analyzer, &subset) {
                (Some(analyzer), Some(ids)) => analyzer.analyze_subset(builder, ids)?,
                (Some(analyzer), None) => analyzer.process(builder)?,
                (None, _) => {}
            }

            self.only = subset.clone();
            let outcome = process_definitions(self, builder);
            self.only = None;
            outcome?;

            // A shared target had exactly one referrer, now satisfied inline.
            let inlined: Vec<String> = self.round_inlined.drain().collect();
            for id in inlined {
                let removable = builder
                    .definition(&id)
                    .is_some_and(|def| def.shared && !def.public);
                if removable {
                    builder.remove_definition(&id);
                    builder.log(NAME, format!("removed inlined service '{id}'"));
                }
            }

            if self.analyzer.is_none() || !self.inlined_any {
                break;
            }
            subset = Some(self.connected.clone());
        }

        // Non-shared private definitions were cloned into every call site;
        // drop the originals nothing references anymore.
        if let Some(analyzer) = &mut self.analyzer {
            analyzer.process(builder)?;
            let unreferenced: Vec<String> = builder
                .definitions()
                .iter()
                .filter(|(id, def)| {
                    !def.public && !def.shared && builder.graph().in_edges(id).is_empty()
                })
                .map(|(id, _)| id.clone())
                .collect();
            for id in unreferenced {
                builder.remove_definition(&id);
                builder.log(NAME, format!("removed inlined service '{id}'"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::reference::{InvalidBehavior, Reference};
    use weft_core::value::Argument;

    fn inline(builder: &mut ContainerBuilder) -> CompileResult<()> {
        InlineDefinitionsPass::new().process(builder)
    }

    fn argument_definition<'a>(builder: &'a ContainerBuilder, id: &str) -> &'a weft_core::definition::Definition {
        let Value::Definition(def) = &builder.definition(id).unwrap().arguments()[0] else {
            panic!("expected an inlined definition in '{id}'");
        };
        def
    }

    #[test]
    fn private_single_use_definition_is_inlined_and_removed() {
        let mut builder = ContainerBuilder::new();
        builder.register("logger", "FileLogger").add_argument("/var/log/app.log");
        builder
            .register("app", "App")
            .set_public(true)
            .add_argument(Reference::new("logger"));

        inline(&mut builder).unwrap();

        assert!(!builder.has_definition("logger"));
        let inlined = argument_definition(&builder, "app");
        assert_eq!(inlined.class(), Some("FileLogger"));
        assert_eq!(inlined.arguments(), &[Value::string("/var/log/app.log")]);
        assert!(
            builder
                .log_entries()
                .iter()
                .any(|e| e.message == "inlined service 'logger' into 'app'")
        );
    }

    #[test]
    fn public_definitions_are_never_inlined() {
        let mut builder = ContainerBuilder::new();
        builder.register("logger", "FileLogger").set_public(true);
        builder
            .register("app", "App")
            .set_public(true)
            .add_argument(Reference::new("logger"));

        inline(&mut builder).unwrap();

        assert!(builder.has_definition("logger"));
        assert_eq!(
            builder.definition("app").unwrap().arguments(),
            &[Value::Reference(Reference::new("logger"))]
        );
    }

    #[test]
    fn shared_target_with_two_referrers_is_kept() {
        let mut builder = ContainerBuilder::new();
        builder.register("logger", "FileLogger");
        builder
            .register("a", "A")
            .set_public(true)
            .add_argument(Reference::new("logger"));
        builder
            .register("b", "B")
            .set_public(true)
            .add_argument(Reference::new("logger"));

        inline(&mut builder).unwrap();

        assert!(builder.has_definition("logger"));
    }

    #[test]
    fn lazy_and_synthetic_targets_are_kept() {
        let mut builder = ContainerBuilder::new();
        builder.register("lazy", "Lazy").set_lazy(true);
        builder.register("synthetic", "Synthetic").set_synthetic(true);
        builder
            .register("app", "App")
            .set_public(true)
            .add_argument(Reference::new("lazy"))
            .add_argument(Reference::new("synthetic"));

        inline(&mut builder).unwrap();

        assert!(builder.has_definition("lazy"));
        assert!(builder.has_definition("synthetic"));
    }

    #[test]
    fn extenders_block_inlining() {
        let mut builder = ContainerBuilder::new();
        builder.register("logger", "FileLogger");
        builder.add_extender("logger", "configure_logging");
        builder
            .register("app", "App")
            .set_public(true)
            .add_argument(Reference::new("logger"));

        inline(&mut builder).unwrap();

        assert!(builder.has_definition("logger"));
    }

    #[test]
    fn non_shared_target_is_cloned_per_call_site() {
        let mut builder = ContainerBuilder::new();
        builder.register("scratch", "Scratch").set_shared(false);
        builder
            .register("a", "A")
            .set_public(true)
            .add_argument(Reference::new("scratch"));
        builder
            .register("b", "B")
            .set_public(true)
            .add_argument(Reference::new("scratch"));

        inline(&mut builder).unwrap();

        assert_eq!(argument_definition(&builder, "a").class(), Some("Scratch"));
        assert_eq!(argument_definition(&builder, "b").class(), Some("Scratch"));
        assert!(!builder.has_definition("scratch"));
    }

    #[test]
    fn weak_in_edge_keeps_a_non_shared_target() {
        let mut builder = ContainerBuilder::new();
        builder.register("scratch", "Scratch").set_shared(false);
        builder
            .register("app", "App")
            .set_public(true)
            .add_argument(Reference::with_behavior(
                "scratch",
                InvalidBehavior::IgnoreOnUninitialized,
            ));

        inline(&mut builder).unwrap();

        assert!(builder.has_definition("scratch"));
    }

    #[test]
    fn lazy_wrapped_reference_keeps_the_target() {
        let mut builder = ContainerBuilder::new();
        builder.register("inner", "Inner");
        builder
            .register("app", "App")
            .set_public(true)
            .add_argument(Value::Argument(Box::new(Argument::lazy(Reference::new(
                "inner",
            )))));

        inline(&mut builder).unwrap();

        assert!(builder.has_definition("inner"));
    }

    #[test]
    fn chains_collapse_over_multiple_rounds() {
        let mut builder = ContainerBuilder::new();
        builder.register("c", "C");
        builder.register("b", "B").add_argument(Reference::new("c"));
        builder
            .register("a", "A")
            .set_public(true)
            .add_argument(Reference::new("b"));

        inline(&mut builder).unwrap();

        assert!(!builder.has_definition("b"));
        assert!(!builder.has_definition("c"));
        let b = argument_definition(&builder, "a");
        assert_eq!(b.class(), Some("B"));
        let Value::Definition(c) = &b.arguments()[0] else {
            panic!("expected 'c' inlined inside 'b'");
        };
        assert_eq!(c.class(), Some("C"));
    }

    #[test]
    fn self_referencing_shared_target_is_kept() {
        let mut builder = ContainerBuilder::new();
        builder
            .register("loop", "Loop")
            .add_argument(Reference::new("loop"));
        builder
            .register("app", "App")
            .set_public(true)
            .add_argument(Reference::new("loop"));

        inline(&mut builder).unwrap();

        assert!(builder.has_definition("loop"));
    }

    #[test]
    fn non_shared_cycle_is_detected_while_cloning() {
        let mut builder = ContainerBuilder::new();
        builder
            .register("ping", "Ping")
            .set_shared(false)
            .add_argument(Reference::new("pong"));
        builder
            .register("pong", "Pong")
            .set_shared(false)
            .add_argument(Reference::new("ping"));
        builder
            .register("app", "App")
            .set_public(true)
            .add_argument(Reference::new("ping"));

        let err = inline(&mut builder).unwrap_err();
        assert!(matches!(err, CompileError::CircularDependency { .. }));
    }
}
