//! Weft Core
//!
//! The data model shared by the container compiler: service definitions,
//! references, the mutable builder passes operate on, the service reference
//! graph and precomputed class metadata.
//!
//! ## Modules
//!
//! - [`builder`]: `ContainerBuilder`, the shared mutable compilation state
//! - [`definition`]: `Definition`, `Alias` and the change-tracking flags
//! - [`error`]: `CompileError` and `CompileResult`
//! - [`graph`]: `ServiceReferenceGraph` built by dependency analysis
//! - [`metadata`]: class and method metadata used by autowiring
//! - [`reference`]: `Reference` and its invalid-target behaviors
//! - [`value`]: the argument value tree

pub mod builder;
pub mod definition;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod reference;
pub mod value;

pub use builder::{CONTAINER_ID, ContainerBuilder, LogEntry};
pub use definition::{
    Alias, Changes, Decoration, Definition, DefinitionKind, FactoryTarget, MethodCall, Property,
};
pub use error::{CompileError, CompileResult};
pub use graph::{EdgeMeta, GraphNode, NodeValue, ServiceReferenceGraph};
pub use metadata::{CONSTRUCTOR, ClassMeta, MetadataRegistry, MethodMeta, ParamMeta, TypeRef};
pub use reference::{InvalidBehavior, Reference};
pub use value::{Argument, ArgumentKind, Value};
