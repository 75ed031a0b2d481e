//! Accumulates the reachable-memory graph and renders it to Graphviz DOT
//!. Vertices are [`MemoryRecord`]s; edges carry the field/
//! variable name the engine reached the target object under.

use std::fs;
use std::path::Path;

use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::Error;
use crate::record::MemoryRecord;

/// An edge label: the name a child was reached under (a field name, an
/// array index like `[3]`, a local variable name, ...).
#[derive(Debug, Clone)]
pub struct Edge {
    pub label: String,
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Thin wrapper over a [`DiGraph`] that knows how to add a record-bearing
/// vertex and an edge labeled with the reaching name, and how to export
/// itself as DOT.
#[derive(Default)]
pub struct GraphBuilder {
    graph: DiGraph<MemoryRecord, Edge>,
}

impl GraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, record: MemoryRecord) -> NodeIndex {
        self.graph.add_node(record)
    }

    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, label: impl Into<String>) {
        self.graph.add_edge(from, to, Edge { label: label.into() });
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn record(&self, node: NodeIndex) -> &MemoryRecord {
        &self.graph[node]
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Every edge's label, in no particular order. Used to assert on the
    /// label vocabulary (`*`, `[i]`, `.field`, `cast`) without exposing the
    /// underlying `petgraph` edge index type.
    pub fn edge_labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.graph.edge_weights().map(|edge| edge.label.as_str())
    }

    /// Render as Graphviz DOT using each vertex's label and
    /// write it to `path`.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let labeled = self.graph.map(|_, record| record.label(), |_, edge| edge.label.clone());
        let dot = Dot::new(&labeled);
        fs::write(path, format!("{dot:?}")).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
