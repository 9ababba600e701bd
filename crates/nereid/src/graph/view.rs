//! Visualization-ready graph view.
//!
//! Identifiers are hashes of file paths, so an unchanged edge set always
//! renders to the same node and edge ids.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use xxhash_rust::xxh3::xxh3_64;

use super::CycleAnalysis;
use crate::types::{DependencyEdge, DocumentMeta, Language};

/// Language reported for files the indexer and extension both leave unknown.
const UNKNOWN_LANGUAGE: &str = "unknown";

/// A file in the rendered graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Stable id derived from the file path
    pub id: String,
    /// Final path segment
    pub label: String,
    /// Path relative to the repository root
    pub file_path: String,
    /// Indexer language, else inferred from the extension, else `"unknown"`
    pub language: String,
}

/// A dependency in the rendered graph. `source` and `target` are node ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    /// Stable id derived from the endpoint paths
    pub id: String,
    /// Node id of the dependent file
    pub source: String,
    /// Node id of the file depended upon
    pub target: String,
    /// `"import"`, `"reference"` or `"import+reference"`
    #[serde(rename = "type")]
    pub kind: String,
    /// Whether the edge lies on a dependency cycle
    pub is_cycle: bool,
    /// Distinct symbols behind the edge
    pub weight: u32,
}

/// Nodes, edges and human-readable cycle edges for one key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphView {
    /// Files, sorted by path
    pub nodes: Vec<GraphNode>,
    /// Edges, sorted by `(source path, target path)`
    pub edges: Vec<GraphEdge>,
    /// Cycle edges rendered as `"source → target"` (paths, not ids)
    pub cycles: Vec<String>,
}

/// Stable node id for a file path.
#[must_use]
pub fn node_id(path: &str) -> String {
    format!("n{:016x}", xxh3_64(path.as_bytes()))
}

/// Stable edge id for a `(source, target)` path pair.
#[must_use]
pub fn edge_id(source: &str, target: &str) -> String {
    let mut bytes = Vec::with_capacity(source.len() + target.len() + 1);
    bytes.extend_from_slice(source.as_bytes());
    bytes.push(0);
    bytes.extend_from_slice(target.as_bytes());
    format!("e{:016x}", xxh3_64(&bytes))
}

/// Build the view from an edge set and the key's document metadata.
///
/// Nodes are exactly the files that appear as edge endpoints; documents with
/// no edges are left out.
#[must_use]
pub fn assemble(edges: &[DependencyEdge], documents: &HashMap<String, DocumentMeta>) -> GraphView {
    let analysis = CycleAnalysis::from_edges(edges);

    let files: BTreeSet<&str> = edges
        .iter()
        .flat_map(|e| [e.source_file.as_str(), e.target_file.as_str()])
        .collect();

    let nodes = files
        .into_iter()
        .map(|path| GraphNode {
            id: node_id(path),
            label: label_for(path),
            file_path: path.to_string(),
            language: language_for(path, documents),
        })
        .collect();

    let mut ordered: Vec<&DependencyEdge> = edges.iter().collect();
    ordered.sort_by(|a, b| (&a.source_file, &a.target_file).cmp(&(&b.source_file, &b.target_file)));

    let mut cycles = Vec::new();
    let graph_edges = ordered
        .into_iter()
        .map(|edge| {
            let is_cycle = analysis.is_cycle_edge(&edge.source_file, &edge.target_file);
            if is_cycle {
                cycles.push(format!("{} → {}", edge.source_file, edge.target_file));
            }
            GraphEdge {
                id: edge_id(&edge.source_file, &edge.target_file),
                source: node_id(&edge.source_file),
                target: node_id(&edge.target_file),
                kind: edge.dep_kinds.label().to_string(),
                is_cycle,
                weight: edge.symbol_count,
            }
        })
        .collect();

    GraphView {
        nodes,
        edges: graph_edges,
        cycles,
    }
}

fn label_for(path: &str) -> String {
    path.rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(path)
        .to_string()
}

fn language_for(path: &str, documents: &HashMap<String, DocumentMeta>) -> String {
    documents
        .get(path)
        .and_then(|doc| doc.language.as_deref())
        .filter(|lang| !lang.trim().is_empty())
        .map(str::to_string)
        .or_else(|| Language::from_path(path).map(|lang| lang.as_str().to_string()))
        .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string())
}
