//! Weft
//!
//! A compile-time dependency-injection container: service definitions go in,
//! a validated and optimized service graph comes out.
//!
//! The heavy lifting lives in two member crates re-exported here:
//!
//! - [`core`]: the definition model, the container builder, the service
//!   reference graph and the error taxonomy.
//! - [`compiler`]: the pass pipeline that normalizes, autowires, validates
//!   and optimizes a builder in place.
//!
//! ```no_run
//! use weft::prelude::*;
//!
//! let mut builder = ContainerBuilder::new();
//! builder.register("logger", "FileLogger");
//! builder
//!     .register("app", "App")
//!     .set_public(true)
//!     .add_argument(Value::Reference(Reference::new("logger")));
//!
//! Compiler::standard().compile(&mut builder)?;
//! # Ok::<(), CompileError>(())
//! ```

pub use weft_compiler as compiler;
pub use weft_core as core;

// Re-export main types
pub mod prelude {
    pub use weft_compiler::walker::{ValueTransformer, WalkContext};
    pub use weft_compiler::{
        AnalyzeReferencesPass, AutowireArrayParametersPass, AutowirePass,
        CheckArgumentsValidityPass, CheckCircularReferencesPass, CheckDefinitionValidityPass,
        Compiler, DecoratorPass, InlineDefinitionsPass, Pass, PlaceholderProcessor,
        PropagatePreloadTagsPass, RemoveUnusedDefinitionsPass, ResolveAliasesPass,
        ResolveInvalidReferencesPass, ResolvePlaceholdersPass, ResolveUndefinedDefinitionsPass,
    };
    pub use weft_core::builder::{ContainerBuilder, LogEntry, CONTAINER_ID};
    pub use weft_core::definition::{
        Alias, Changes, Decoration, Definition, DefinitionKind, FactoryTarget, MethodCall,
        Property,
    };
    pub use weft_core::error::{CompileError, CompileResult};
    pub use weft_core::graph::{EdgeMeta, GraphNode, NodeValue, ServiceReferenceGraph};
    pub use weft_core::metadata::{
        ClassMeta, MetadataRegistry, MethodMeta, ParamMeta, TypeRef, CONSTRUCTOR,
    };
    pub use weft_core::reference::{InvalidBehavior, Reference};
    pub use weft_core::value::{Argument, ArgumentKind, Value};
}
