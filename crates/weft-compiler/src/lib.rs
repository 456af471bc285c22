//! Weft Compiler
//!
//! The pass pipeline that turns a mutable set of service definitions into a
//! validated, optimized, ready-to-instantiate service graph.
//!
//! ## Architecture
//!
//! - **Walker**: a single recursive engine over the definition value tree;
//!   every pass implements [`walker::ValueTransformer`] and overrides only
//!   the node kinds it cares about.
//! - **Passes**: each pass exposes one operation,
//!   `process(&mut self, &mut ContainerBuilder)`, communicating exclusively
//!   through builder mutation and `CompileError` returns.
//! - **Compiler**: runs exactly the ordered pass list it was given.
//!
//! ## Modules
//!
//! - [`walker`]: `WalkContext`, `ValueTransformer`, `process_definitions`
//! - [`passes`]: every concrete compiler pass

pub mod passes;
pub mod walker;

use weft_core::builder::ContainerBuilder;
use weft_core::error::CompileResult;

pub use passes::analysis::AnalyzeReferencesPass;
pub use passes::autowire::AutowirePass;
pub use passes::autowire_arrays::AutowireArrayParametersPass;
pub use passes::cycles::CheckCircularReferencesPass;
pub use passes::decorators::DecoratorPass;
pub use passes::inline::InlineDefinitionsPass;
pub use passes::invalid_refs::ResolveInvalidReferencesPass;
pub use passes::materialize::ResolveUndefinedDefinitionsPass;
pub use passes::placeholders::{PlaceholderProcessor, ResolvePlaceholdersPass};
pub use passes::preload::PropagatePreloadTagsPass;
pub use passes::prune::RemoveUnusedDefinitionsPass;
pub use passes::resolve_aliases::ResolveAliasesPass;
pub use passes::validity::{CheckArgumentsValidityPass, CheckDefinitionValidityPass};

/// One compilation step over the shared builder.
///
/// A pass either completes leaving the builder consistent or returns an
/// error that aborts the whole compilation. Pass values are reusable across
/// compilations; per-run scratch is reset at the top of `process`.
pub trait Pass {
    /// The pass name used in log entries and diagnostics.
    fn name(&self) -> &'static str;

    /// Run the pass against the builder.
    fn process(&mut self, builder: &mut ContainerBuilder) -> CompileResult<()>;
}

/// Runs an ordered list of passes over one builder.
///
/// The compiler adds nothing of its own: pass selection and ordering are
/// entirely the caller's. [`Compiler::standard`] builds the canonical
/// pipeline for callers without special needs.
#[derive(Default)]
pub struct Compiler {
    passes: Vec<Box<dyn Pass>>,
}

impl Compiler {
    /// Create a compiler with no passes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compiler from an explicit pass list.
    pub fn with_passes(passes: Vec<Box<dyn Pass>>) -> Self {
        Compiler { passes }
    }

    /// The canonical pipeline: placeholders, structural normalization,
    /// autowiring, analysis, validation and optimization, in the order the
    /// passes expect each other's outputs.
    pub fn standard() -> Self {
        Compiler::with_passes(vec![
            Box::new(ResolvePlaceholdersPass::new()),
            Box::new(ResolveUndefinedDefinitionsPass::new()),
            Box::new(CheckDefinitionValidityPass::new()),
            Box::new(AutowireArrayParametersPass::new()),
            Box::new(AutowirePass::new()),
            Box::new(DecoratorPass::new()),
            Box::new(ResolveAliasesPass::new()),
            Box::new(ResolveInvalidReferencesPass::new()),
            Box::new(AnalyzeReferencesPass::new()),
            Box::new(CheckCircularReferencesPass::new()),
            Box::new(InlineDefinitionsPass::new()),
            Box::new(AnalyzeReferencesPass::new()),
            Box::new(RemoveUnusedDefinitionsPass::new()),
            Box::new(CheckArgumentsValidityPass::new()),
            Box::new(PropagatePreloadTagsPass::new()),
        ])
    }

    /// Append a pass.
    pub fn add_pass(&mut self, pass: Box<dyn Pass>) -> &mut Self {
        self.passes.push(pass);
        self
    }

    /// The configured passes, in execution order.
    pub fn passes(&self) -> &[Box<dyn Pass>] {
        &self.passes
    }

    /// Run every pass in order, stopping at the first error.
    pub fn compile(&mut self, builder: &mut ContainerBuilder) -> CompileResult<()> {
        for pass in &mut self.passes {
            tracing::debug!(pass = pass.name(), "running compiler pass");
            pass.process(builder)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tally(&'static str);

    impl Pass for Tally {
        fn name(&self) -> &'static str {
            self.0
        }

        fn process(&mut self, builder: &mut ContainerBuilder) -> CompileResult<()> {
            builder.log(self.0, "ran");
            Ok(())
        }
    }

    #[test]
    fn compile_runs_passes_in_order() {
        let mut compiler = Compiler::new();
        compiler.add_pass(Box::new(Tally("first")));
        compiler.add_pass(Box::new(Tally("second")));

        let mut builder = ContainerBuilder::new();
        compiler.compile(&mut builder).unwrap();

        let order: Vec<_> = builder
            .log_entries()
            .iter()
            .map(|e| e.pass.clone())
            .collect();
        assert_eq!(order, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn compile_stops_at_the_first_error() {
        struct Fail;
        impl Pass for Fail {
            fn name(&self) -> &'static str {
                "fail"
            }
            fn process(&mut self, _: &mut ContainerBuilder) -> CompileResult<()> {
                Err(weft_core::error::CompileError::runtime("boom"))
            }
        }

        let mut compiler = Compiler::new();
        compiler.add_pass(Box::new(Fail));
        compiler.add_pass(Box::new(Tally("after")));

        let mut builder = ContainerBuilder::new();
        assert!(compiler.compile(&mut builder).is_err());
        assert!(builder.log_entries().is_empty());
    }
}
