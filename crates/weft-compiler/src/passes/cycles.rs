//! Circular-reference detection over the analyzed graph.

use rustc_hash::FxHashSet;
use weft_core::builder::ContainerBuilder;
use weft_core::error::{CompileError, CompileResult};
use weft_core::graph::ServiceReferenceGraph;

use crate::Pass;

/// Detects reference cycles in the service graph.
///
/// Runs a DFS from every node with a path stack and a checked-node memo.
/// An out-edge is followed only when the target node has no value, or the
/// edge is neither lazy nor weak. Note the first arm: a lazy or weak edge
/// into a valueless node is still followed.
///
/// Expects the graph produced by a directly preceding analysis run.
#[derive(Default)]
pub struct CheckCircularReferencesPass {
    checked: FxHashSet<String>,
    path: Vec<String>,
}

impl CheckCircularReferencesPass {
    /// Create the pass.
    pub fn new() -> Self {
        Self::default()
    }

    fn check_node(&mut self, graph: &ServiceReferenceGraph, id: &str) -> CompileResult<()> {
        self.path.push(id.to_string());
        for (edge, dest) in graph.out_edges(id) {
            if self.checked.contains(&dest.id) {
                continue;
            }
            if dest.value.is_some() && (edge.lazy || edge.weak) {
                continue;
            }
            if let Some(start) = self.path.iter().position(|p| p == &dest.id) {
                let mut cycle: Vec<String> = self.path[start..].to_vec();
                cycle.push(dest.id.clone());
                return Err(CompileError::CircularDependency { path: cycle });
            }
            self.check_node(graph, &dest.id)?;
        }
        self.path.pop();
        self.checked.insert(id.to_string());
        Ok(())
    }
}

impl Pass for CheckCircularReferencesPass {
    fn name(&self) -> &'static str {
        "CheckCircularReferencesPass"
    }

    fn process(&mut self, builder: &mut ContainerBuilder) -> CompileResult<()> {
        self.checked.clear();
        self.path.clear();

        let ids: Vec<String> = builder.graph().ids().map(str::to_string).collect();
        for id in ids {
            if self.checked.contains(&id) {
                continue;
            }
            self.path.clear();
            self.check_node(builder.graph(), &id)?;
        }
        Ok(())
    }
}
