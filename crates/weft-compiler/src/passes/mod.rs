//! The concrete compiler passes.

pub mod analysis;
pub mod autowire;
pub mod autowire_arrays;
pub mod cycles;
pub mod decorators;
pub mod inline;
pub mod invalid_refs;
pub mod materialize;
pub mod placeholders;
pub mod preload;
pub mod prune;
pub mod resolve_aliases;
pub mod validity;
