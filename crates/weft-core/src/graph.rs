//! The service reference graph.
//!
//! Directed graph of service ids with "depends on" edges carrying laziness,
//! weakness and constructor-position metadata. Built from scratch by the
//! dependency analysis pass on every run; consumed by the cycle check, the
//! inliner and the unused-definition pruner.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: [`GraphNode`] (id plus an optional snapshot of the owning
//!   definition or alias)
//! - Edges: [`EdgeMeta`]
//!
//! A `rustc-hash` side index maps ids to node indices for O(1) lookup;
//! iteration always goes through the graph itself so the order is the
//! deterministic insertion order.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;

use crate::definition::{Alias, Definition};
use crate::reference::Reference;

/// The value a graph node was created from.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    /// The node belongs to a definition.
    Definition(Definition),
    /// The node belongs to an alias.
    Alias(Alias),
}

/// One service id in the graph.
#[derive(Debug, Clone)]
pub struct GraphNode {
    /// The service id.
    pub id: String,
    /// Snapshot of the owning definition or alias, when known at connect
    /// time. Absent for ids that only ever appear as reference targets.
    pub value: Option<NodeValue>,
}

/// Metadata attached to a dependency edge.
#[derive(Debug, Clone)]
pub struct EdgeMeta {
    /// The reference this edge was built from, when there was one.
    pub reference: Option<Reference>,
    /// The dependency is deferred behind a proxy or lazy wrapper.
    pub lazy: bool,
    /// The dependency is skipped while the target is uninitialized.
    pub weak: bool,
    /// The reference sits in the constructor-argument subtree.
    pub by_constructor: bool,
}

/// A directed graph of service dependencies.
#[derive(Debug, Default)]
pub struct ServiceReferenceGraph {
    graph: DiGraph<GraphNode, EdgeMeta>,
    indices: FxHashMap<String, NodeIndex>,
}

impl ServiceReferenceGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every node and edge.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.indices.clear();
    }

    /// Check if an id has a node.
    pub fn has_node(&self, id: &str) -> bool {
        self.indices.contains_key(id)
    }

    /// Get the node for an id.
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.indices.get(id).map(|&ix| &self.graph[ix])
    }

    /// Every node id, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(|ix| self.graph[ix].id.as_str())
    }

    /// Number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Connect `source -> dest` with the given edge metadata.
    ///
    /// Nodes are created on demand; a node's value is fixed by whichever
    /// connect call creates it first.
    #[allow(clippy::too_many_arguments)]
    pub fn connect(
        &mut self,
        source: &str,
        source_value: Option<NodeValue>,
        dest: &str,
        dest_value: Option<NodeValue>,
        reference: Option<Reference>,
        lazy: bool,
        weak: bool,
        by_constructor: bool,
    ) {
        let source_ix = self.ensure_node(source, source_value);
        let dest_ix = self.ensure_node(dest, dest_value);
        let _ = self.graph.add_edge(
            source_ix,
            dest_ix,
            EdgeMeta {
                reference,
                lazy,
                weak,
                by_constructor,
            },
        );
    }

    /// Outgoing edges of an id: `(edge, destination node)` pairs in
    /// insertion order.
    pub fn out_edges(&self, id: &str) -> Vec<(&EdgeMeta, &GraphNode)> {
        let Some(&ix) = self.indices.get(id) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(ix, Direction::Outgoing)
            .map(|e| (e.id(), e.weight(), &self.graph[e.target()]))
            .collect();
        // petgraph iterates adjacency lists newest-first; restore insertion order.
        edges.sort_by_key(|(edge_ix, _, _)| *edge_ix);
        edges.into_iter().map(|(_, meta, node)| (meta, node)).collect()
    }

    /// Incoming edges of an id: `(edge, source node)` pairs in insertion
    /// order.
    pub fn in_edges(&self, id: &str) -> Vec<(&EdgeMeta, &GraphNode)> {
        let Some(&ix) = self.indices.get(id) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(ix, Direction::Incoming)
            .map(|e| (e.id(), e.weight(), &self.graph[e.source()]))
            .collect();
        edges.sort_by_key(|(edge_ix, _, _)| *edge_ix);
        edges.into_iter().map(|(_, meta, node)| (meta, node)).collect()
    }

    /// A flat, deterministic dump of every edge:
    /// `(source, dest, lazy, weak, by_constructor)`.
    pub fn edge_list(&self) -> Vec<(String, String, bool, bool, bool)> {
        self.graph
            .edge_indices()
            .filter_map(|ix| {
                let (s, d) = self.graph.edge_endpoints(ix)?;
                let meta = &self.graph[ix];
                Some((
                    self.graph[s].id.clone(),
                    self.graph[d].id.clone(),
                    meta.lazy,
                    meta.weak,
                    meta.by_constructor,
                ))
            })
            .collect()
    }

    fn ensure_node(&mut self, id: &str, value: Option<NodeValue>) -> NodeIndex {
        if let Some(&ix) = self.indices.get(id) {
            return ix;
        }
        let ix = self.graph.add_node(GraphNode {
            id: id.to_string(),
            value,
        });
        self.indices.insert(id.to_string(), ix);
        ix
    }
}
