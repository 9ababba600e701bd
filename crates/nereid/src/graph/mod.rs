//! Graph operations over a key's edge set.
//!
//! This module provides:
//! - Bounded, cycle-aware transitive closure (`closure`)
//! - Strongly connected component analysis (`cycles`)
//! - The visualization-ready graph view (`view`)
//!
//! ## Design
//!
//! - The closure walk is written once against [`EdgeSource`]; a store
//!   [`Snapshot`](crate::Snapshot) and the in-memory [`EdgeMap`] both
//!   implement it
//! - Depth and cycle handling live in the traversal itself, not in SQL
//! - Petgraph handles the whole-graph SCC pass

mod closure;
mod cycles;
mod view;

pub use closure::{compute_closure, effective_max_depth};
pub use cycles::CycleAnalysis;
pub use view::{assemble, edge_id, node_id, GraphEdge, GraphNode, GraphView};

use std::collections::HashMap;

use crate::error::Result;
use crate::types::DependencyEdge;

/// Anything that can answer "what does this file depend on?".
pub trait EdgeSource {
    /// Direct outgoing edges of `file`. Unknown files have none.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn outgoing(&self, file: &str) -> Result<Vec<DependencyEdge>>;
}

/// An adjacency list held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct EdgeMap {
    adjacency: HashMap<String, Vec<DependencyEdge>>,
}

impl EdgeMap {
    /// Index edges by source file. Each file's edges are kept ordered by target.
    #[must_use]
    pub fn from_edges(edges: impl IntoIterator<Item = DependencyEdge>) -> Self {
        let mut adjacency: HashMap<String, Vec<DependencyEdge>> = HashMap::new();
        for edge in edges {
            adjacency.entry(edge.source_file.clone()).or_default().push(edge);
        }
        for outgoing in adjacency.values_mut() {
            outgoing.sort_by(|a, b| a.target_file.cmp(&b.target_file));
        }
        Self { adjacency }
    }

    /// Number of edges held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    /// Whether the map holds no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adjacency.values().all(Vec::is_empty)
    }
}

impl EdgeSource for EdgeMap {
    fn outgoing(&self, file: &str) -> Result<Vec<DependencyEdge>> {
        Ok(self.adjacency.get(file).cloned().unwrap_or_default())
    }
}
