//! Dependency analysis: builds the service reference graph.

use rustc_hash::FxHashSet;
use weft_core::builder::{CONTAINER_ID, ContainerBuilder};
use weft_core::definition::{Definition, DefinitionKind, FactoryTarget};
use weft_core::error::CompileResult;
use weft_core::graph::NodeValue;
use weft_core::reference::Reference;
use weft_core::value::{ArgumentKind, Value};

use crate::Pass;
use crate::walker::{WalkContext, ValueTransformer, process_definitions, walk_value};

/// Rebuilds the service reference graph from a clean state.
///
/// Alias edges are connected first (skipping container-self targets), then
/// every definition is walked and each reference found becomes an edge
/// `current_id -> target` classified as:
/// - **lazy**: nested inside an [`ArgumentKind::Lazy`] wrapper, or the target
///   definition is lazy while proxying is enabled;
/// - **weak**: the reference behavior is `IgnoreOnUninitialized`;
/// - **by_constructor**: found inside the constructor-argument subtree
///   (object arguments, factory class arguments, and every method call up to
///   the last wither).
///
/// Unlike the default walker this pass reads every field regardless of
/// change bits: analysis never overwrites anything, it only observes.
pub struct AnalyzeReferencesPass {
    lazy_proxies: bool,
    only: Option<FxHashSet<String>>,
    lazy: bool,
    by_constructor: bool,
    source: Option<Definition>,
}

impl Default for AnalyzeReferencesPass {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzeReferencesPass {
    /// Full analysis with lazy-definition proxying enabled.
    pub fn new() -> Self {
        AnalyzeReferencesPass {
            lazy_proxies: true,
            only: None,
            lazy: false,
            by_constructor: false,
            source: None,
        }
    }

    /// Analysis that treats lazy target definitions as eager (no proxying).
    pub fn without_proxies() -> Self {
        AnalyzeReferencesPass {
            lazy_proxies: false,
            ..AnalyzeReferencesPass::new()
        }
    }

    /// Run a filtered analysis restricted to the given source ids.
    ///
    /// The inliner uses this each fixed-point round to re-analyze only the
    /// definitions touched since the previous round.
    pub fn analyze_subset(
        &mut self,
        builder: &mut ContainerBuilder,
        ids: &FxHashSet<String>,
    ) -> CompileResult<()> {
        self.only = Some(ids.clone());
        let outcome = self.analyze(builder);
        self.only = None;
        outcome
    }

    fn analyze(&mut self, builder: &mut ContainerBuilder) -> CompileResult<()> {
        self.lazy = false;
        self.by_constructor = false;
        self.source = None;
        builder.reset_graph();

        let aliases: Vec<(String, weft_core::definition::Alias)> = builder
            .aliases()
            .iter()
            .map(|(id, alias)| (id.clone(), alias.clone()))
            .collect();
        for (id, alias) in aliases {
            if alias.target == CONTAINER_ID {
                continue;
            }
            if let Some(only) = &self.only
                && !only.contains(&id)
            {
                continue;
            }
            let target_value = builder
                .definition(&alias.target)
                .cloned()
                .map(NodeValue::Definition);
            let target = alias.target.clone();
            builder.graph_mut().connect(
                &id,
                Some(NodeValue::Alias(alias)),
                &target,
                target_value,
                Some(Reference::new(target.clone())),
                false,
                false,
                false,
            );
        }

        process_definitions(self, builder)
    }

    fn record_edge(&mut self, ctx: &mut WalkContext<'_>, reference: &Reference) {
        let Some(source_id) = ctx.current_id.clone() else {
            return;
        };
        let target = ctx.builder.resolve_alias(&reference.id).to_string();
        if target == CONTAINER_ID {
            return;
        }
        let target_def = ctx.builder.definition(&target).cloned();
        let lazy =
            self.lazy || (self.lazy_proxies && target_def.as_ref().is_some_and(|d| d.lazy));
        ctx.builder.graph_mut().connect(
            &source_id,
            self.source.clone().map(NodeValue::Definition),
            &target,
            target_def.map(NodeValue::Definition),
            Some(reference.clone()),
            lazy,
            reference.is_weak(),
            self.by_constructor,
        );
    }

    fn walk_args(
        &mut self,
        ctx: &mut WalkContext<'_>,
        args: Vec<Value>,
    ) -> CompileResult<Vec<Value>> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            out.push(self.transform(ctx, arg, false)?);
        }
        Ok(out)
    }

    fn process_definition(
        &mut self,
        ctx: &mut WalkContext<'_>,
        mut def: Definition,
        is_root: bool,
    ) -> CompileResult<Definition> {
        if is_root {
            self.lazy = false;
            self.by_constructor = false;
            self.source = Some(def.clone());
        }
        let outer_by_constructor = self.by_constructor;
        self.by_constructor = is_root || outer_by_constructor;

        match &mut def.kind {
            DefinitionKind::Object { arguments, .. } => {
                let args = std::mem::take(arguments);
                *arguments = self.walk_args(ctx, args)?;
            }
            DefinitionKind::Factory {
                target,
                class_arguments,
                arguments,
                ..
            } => {
                let class_args = std::mem::take(class_arguments);
                *class_arguments = self.walk_args(ctx, class_args)?;
                if let FactoryTarget::Service(reference) = target {
                    self.record_edge(ctx, reference);
                }
                // Invocation arguments sit outside the constructor subtree.
                self.by_constructor = false;
                let args = std::mem::take(arguments);
                *arguments = self.walk_args(ctx, args)?;
                self.by_constructor = is_root || outer_by_constructor;
            }
            DefinitionKind::Closure {
                callable,
                arguments,
            } => {
                self.by_constructor = false;
                let inner = std::mem::replace(callable.as_mut(), Value::Null);
                **callable = self.transform(ctx, inner, false)?;
                let args = std::mem::take(arguments);
                *arguments = self.walk_args(ctx, args)?;
                self.by_constructor = is_root || outer_by_constructor;
            }
            DefinitionKind::Undefined { .. } => {}
        }

        // Calls up to the last wither are constructor-equivalent.
        let last_wither = def.calls.iter().rposition(|c| c.returns_clone);
        for (index, call) in def.calls.iter_mut().enumerate() {
            self.by_constructor = last_wither.is_some_and(|k| index <= k);
            let args = std::mem::take(&mut call.arguments);
            call.arguments = self.walk_args(ctx, args)?;
        }

        self.by_constructor = false;
        for (_, property) in def.properties.iter_mut() {
            let value = std::mem::replace(&mut property.value, Value::Null);
            property.value = self.transform(ctx, value, false)?;
        }

        self.by_constructor = outer_by_constructor;
        Ok(def)
    }
}

impl ValueTransformer for AnalyzeReferencesPass {
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
        match value {
            Value::Argument(mut arg) => {
                let outer = self.lazy;
                if arg.kind == ArgumentKind::Lazy {
                    self.lazy = true;
                }
                arg.value = self.transform(ctx, arg.value, false)?;
                self.lazy = outer;
                Ok(Value::Argument(arg))
            }
            Value::Reference(reference) => {
                self.record_edge(ctx, &reference);
                walk_value(self, ctx, Value::Reference(reference), false)
            }
            Value::Definition(def) => {
                let def = self.process_definition(ctx, *def, is_root)?;
                Ok(Value::Definition(Box::new(def)))
            }
            other => walk_value(self, ctx, other, is_root),
        }
    }
}

impl Pass for AnalyzeReferencesPass {
    fn name(&self) -> &'static str {
        "AnalyzeReferencesPass"
    }

    fn process(&mut self, builder: &mut ContainerBuilder) -> CompileResult<()> {
        self.only = None;
        self.analyze(builder)
    }
}
