//! Whole-graph cycle detection.
//!
//! An edge lies on a cycle exactly when both of its endpoints belong to the
//! same strongly connected component and that component is non-trivial
//! (more than one file, or a single file with a self-loop).

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::types::{Cycle, DependencyEdge};

/// SCC membership for one edge set.
#[derive(Debug, Clone, Default)]
pub struct CycleAnalysis {
    /// Component index for every file that sits on some cycle
    component_of: HashMap<String, usize>,
    cycles: Vec<Cycle>,
}

impl CycleAnalysis {
    /// Run Tarjan's SCC algorithm over `edges`.
    #[must_use]
    pub fn from_edges(edges: &[DependencyEdge]) -> Self {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut index: HashMap<&str, NodeIndex> = HashMap::new();

        for edge in edges {
            let source = *index
                .entry(edge.source_file.as_str())
                .or_insert_with(|| graph.add_node(edge.source_file.as_str()));
            let target = *index
                .entry(edge.target_file.as_str())
                .or_insert_with(|| graph.add_node(edge.target_file.as_str()));
            graph.add_edge(source, target, ());
        }

        let mut cycles: Vec<Cycle> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&node| graph.find_edge(node, node).is_some())
            })
            .map(|component| {
                let mut files: Vec<String> = component
                    .into_iter()
                    .map(|idx| graph[idx].to_string())
                    .collect();
                files.sort_unstable();
                Cycle { files }
            })
            .collect();
        cycles.sort_unstable();

        let component_of = cycles
            .iter()
            .enumerate()
            .flat_map(|(i, cycle)| cycle.files.iter().map(move |f| (f.clone(), i)))
            .collect();

        Self {
            component_of,
            cycles,
        }
    }

    /// Whether the edge `source → target` lies on a cycle.
    #[must_use]
    pub fn is_cycle_edge(&self, source: &str, target: &str) -> bool {
        match (self.component_of.get(source), self.component_of.get(target)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// The non-trivial components, each sorted, in sorted order.
    #[must_use]
    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    /// Consume the analysis, keeping only the components.
    #[must_use]
    pub fn into_cycles(self) -> Vec<Cycle> {
        self.cycles
    }
}
