//! The container builder.
//!
//! Central mutable state shared by every compiler pass: the definition map,
//! the alias map, the parameter map, the service reference graph, class
//! metadata and the compilation log. Passes communicate exclusively by
//! mutating the builder; no pass holds a reference to it between calls.

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::definition::{Alias, Definition};
use crate::graph::ServiceReferenceGraph;
use crate::metadata::{ClassMeta, MetadataRegistry, MethodMeta};
use crate::value::Value;

/// The reserved id under which the container refers to itself.
///
/// References to this id are never walked, analyzed or inlined.
pub const CONTAINER_ID: &str = "container";

/// One entry in the compilation log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Name of the pass that logged the message.
    pub pass: String,
    /// The message itself.
    pub message: String,
}

/// Mutable compilation state for one container build.
///
/// Definition, alias and parameter maps are insertion-ordered so that every
/// pass observes services in registration order and compilation output is
/// deterministic.
#[derive(Debug, Default)]
pub struct ContainerBuilder {
    definitions: IndexMap<String, Definition>,
    aliases: IndexMap<String, Alias>,
    parameters: IndexMap<String, Value>,
    graph: ServiceReferenceGraph,
    metadata: MetadataRegistry,
    extenders: FxHashMap<String, Vec<String>>,
    log: Vec<LogEntry>,
}

impl ContainerBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================================================
    // Definitions
    // ============================================================================

    /// Register an object definition for `class` under `id` and return it
    /// for further configuration. Replaces any previous definition or alias
    /// with the same id.
    pub fn register(&mut self, id: impl Into<String>, class: impl Into<String>) -> &mut Definition {
        let id = id.into();
        self.aliases.shift_remove(&id);
        match self.definitions.entry(id) {
            indexmap::map::Entry::Occupied(mut entry) => {
                entry.insert(Definition::object(class));
                entry.into_mut()
            }
            indexmap::map::Entry::Vacant(entry) => entry.insert(Definition::object(class)),
        }
    }

    /// Store a definition under `id`, removing any alias with the same id.
    pub fn set_definition(&mut self, id: impl Into<String>, definition: Definition) {
        let id = id.into();
        self.aliases.shift_remove(&id);
        self.definitions.insert(id, definition);
    }

    /// Check for a definition under `id`.
    pub fn has_definition(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Get the definition under `id`.
    pub fn definition(&self, id: &str) -> Option<&Definition> {
        self.definitions.get(id)
    }

    /// Get the definition under `id` mutably.
    pub fn definition_mut(&mut self, id: &str) -> Option<&mut Definition> {
        self.definitions.get_mut(id)
    }

    /// Remove the definition under `id`, returning it if present.
    pub fn remove_definition(&mut self, id: &str) -> Option<Definition> {
        self.definitions.shift_remove(id)
    }

    /// The full definition map, in registration order.
    pub fn definitions(&self) -> &IndexMap<String, Definition> {
        &self.definitions
    }

    /// The full definition map, mutably.
    pub fn definitions_mut(&mut self) -> &mut IndexMap<String, Definition> {
        &mut self.definitions
    }

    /// Take the definition map out of the builder, leaving it empty.
    ///
    /// Paired with [`set_definitions`](Self::set_definitions) by passes that
    /// rebuild the whole map in one go.
    pub fn take_definitions(&mut self) -> IndexMap<String, Definition> {
        std::mem::take(&mut self.definitions)
    }

    /// Put a definition map back, replacing the current one.
    pub fn set_definitions(&mut self, definitions: IndexMap<String, Definition>) {
        self.definitions = definitions;
    }

    // ============================================================================
    // Aliases
    // ============================================================================

    /// Alias `id` to `target`, removing any definition with the same id.
    pub fn set_alias(&mut self, id: impl Into<String>, alias: Alias) {
        let id = id.into();
        self.definitions.shift_remove(&id);
        self.aliases.insert(id, alias);
    }

    /// Check for an alias under `id`.
    pub fn has_alias(&self, id: &str) -> bool {
        self.aliases.contains_key(id)
    }

    /// Get the alias under `id`.
    pub fn alias(&self, id: &str) -> Option<&Alias> {
        self.aliases.get(id)
    }

    /// Remove the alias under `id`, returning it if present.
    pub fn remove_alias(&mut self, id: &str) -> Option<Alias> {
        self.aliases.shift_remove(id)
    }

    /// The full alias map, in registration order.
    pub fn aliases(&self) -> &IndexMap<String, Alias> {
        &self.aliases
    }

    /// The full alias map, mutably.
    pub fn aliases_mut(&mut self) -> &mut IndexMap<String, Alias> {
        &mut self.aliases
    }

    /// Check whether `id` resolves to anything: a definition, an alias or
    /// the container itself.
    pub fn has(&self, id: &str) -> bool {
        id == CONTAINER_ID || self.definitions.contains_key(id) || self.aliases.contains_key(id)
    }

    /// Follow the alias chain from `id` to the final definition id.
    ///
    /// Returns `id` itself when it is not an alias. A circular chain stops
    /// at the first repeated id; flattening such a chain into an error is
    /// the alias-resolution pass's job, not this lookup's.
    pub fn resolve_alias<'a>(&'a self, id: &'a str) -> &'a str {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut current = id;
        while let Some(alias) = self.aliases.get(current) {
            if !seen.insert(current) {
                break;
            }
            current = alias.target.as_str();
        }
        current
    }

    // ============================================================================
    // Parameters
    // ============================================================================

    /// Set the parameter `name`.
    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.parameters.insert(name.into(), value.into());
    }

    /// Check for the parameter `name`.
    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    /// Get the parameter `name`.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Remove the parameter `name`.
    pub fn remove_parameter(&mut self, name: &str) -> Option<Value> {
        self.parameters.shift_remove(name)
    }

    /// The full parameter map.
    pub fn parameters(&self) -> &IndexMap<String, Value> {
        &self.parameters
    }

    /// The full parameter map, mutably.
    pub fn parameters_mut(&mut self) -> &mut IndexMap<String, Value> {
        &mut self.parameters
    }

    // ============================================================================
    // Reference graph
    // ============================================================================

    /// The current service reference graph.
    pub fn graph(&self) -> &ServiceReferenceGraph {
        &self.graph
    }

    /// The current service reference graph, mutably.
    pub fn graph_mut(&mut self) -> &mut ServiceReferenceGraph {
        &mut self.graph
    }

    /// Clear the graph and hand it back for a fresh analysis run.
    pub fn reset_graph(&mut self) -> &mut ServiceReferenceGraph {
        self.graph.clear();
        &mut self.graph
    }

    // ============================================================================
    // Metadata
    // ============================================================================

    /// The class metadata registry.
    pub fn metadata(&self) -> &MetadataRegistry {
        &self.metadata
    }

    /// The class metadata registry, mutably.
    pub fn metadata_mut(&mut self) -> &mut MetadataRegistry {
        &mut self.metadata
    }

    /// Metadata for `class`, when registered.
    pub fn class_meta(&self, class: &str) -> Option<&ClassMeta> {
        self.metadata.get(class)
    }

    /// Metadata for `class::method`, when both are registered.
    pub fn method_meta(&self, class: &str, method: &str) -> Option<&MethodMeta> {
        self.metadata.method(class, method)
    }

    // ============================================================================
    // Extenders
    // ============================================================================

    /// Register an extender for `id`. Extenders post-process the built
    /// service at runtime, which makes the definition ineligible for
    /// inlining.
    pub fn add_extender(&mut self, id: impl Into<String>, extender: impl Into<String>) {
        self.extenders.entry(id.into()).or_default().push(extender.into());
    }

    /// The extenders registered for `id`.
    pub fn extenders(&self, id: &str) -> &[String] {
        self.extenders.get(id).map_or(&[], Vec::as_slice)
    }

    // ============================================================================
    // Logging
    // ============================================================================

    /// Record a diagnostic from `pass`. Diagnostics never influence
    /// compilation, they only describe it.
    pub fn log(&mut self, pass: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(pass, %message, "compiler pass");
        self.log.push(LogEntry {
            pass: pass.to_string(),
            message,
        });
    }

    /// Every diagnostic recorded so far, in order.
    pub fn log_entries(&self) -> &[LogEntry] {
        &self.log
    }
}
