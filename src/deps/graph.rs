//! Import graph of one module version.
//!
//! Nodes are either internal files (by specifier) or external dependencies
//! (by [`DependencyKey`]). Edges point from the importing file.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{Dependency, DependencyError, DependencyKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphNode {
    File(String),
    External(DependencyKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Value,
    TypeOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DependencyStats {
    pub file_count: usize,
    pub dependency_count: usize,
    pub edge_count: usize,
    pub error_count: usize,
}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<GraphNode, ImportKind>,
    /// Index: internal specifier -> node.
    file_index: HashMap<String, NodeIndex>,
    /// Index: dependency key -> node.
    dependency_index: HashMap<DependencyKey, NodeIndex>,
    /// First error seen per specifier.
    errors: BTreeMap<String, String>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Node Operations ────────────────────────────────────────

    pub fn add_file(&mut self, specifier: &str) -> NodeIndex {
        if let Some(&idx) = self.file_index.get(specifier) {
            return idx;
        }
        let idx = self.graph.add_node(GraphNode::File(specifier.to_string()));
        self.file_index.insert(specifier.to_string(), idx);
        idx
    }

    pub fn add_dependency(&mut self, key: DependencyKey) -> NodeIndex {
        if let Some(&idx) = self.dependency_index.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(GraphNode::External(key.clone()));
        self.dependency_index.insert(key, idx);
        idx
    }

    // ─── Edge Operations ────────────────────────────────────────

    /// Add an import edge. A value import upgrades an existing type-only edge.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, kind: ImportKind) {
        match self.graph.find_edge(from, to) {
            Some(edge) => {
                if kind == ImportKind::Value {
                    self.graph[edge] = ImportKind::Value;
                }
            }
            None => {
                self.graph.add_edge(from, to, kind);
            }
        }
    }

    /// Record a resolution failure. Later errors for the same specifier are dropped.
    pub fn record_error(&mut self, specifier: &str, message: impl Into<String>) {
        self.errors
            .entry(specifier.to_string())
            .or_insert_with(|| message.into());
    }

    // ─── Query Operations ───────────────────────────────────────

    /// Internal files, sorted.
    pub fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.file_index.keys().cloned().collect();
        files.sort();
        files
    }

    /// External dependencies sorted by key, each with its importing files.
    pub fn dependencies(&self) -> Vec<Dependency> {
        let mut keys: Vec<&DependencyKey> = self.dependency_index.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| {
                let idx = self.dependency_index[key];
                let dependents: BTreeSet<String> = self
                    .graph
                    .edges_directed(idx, Direction::Incoming)
                    .filter_map(|edge| match &self.graph[edge.source()] {
                        GraphNode::File(specifier) => Some(specifier.clone()),
                        GraphNode::External(_) => None,
                    })
                    .collect();
                Dependency {
                    key: key.clone(),
                    dependents,
                }
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<DependencyError> {
        self.errors
            .iter()
            .map(|(specifier, error)| DependencyError {
                specifier: specifier.clone(),
                error: error.clone(),
            })
            .collect()
    }

    /// Files imported by `specifier` inside the version.
    pub fn imports_of(&self, specifier: &str) -> Vec<String> {
        let Some(&idx) = self.file_index.get(specifier) else {
            return Vec::new();
        };
        let mut out: Vec<String> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter_map(|edge| match &self.graph[edge.target()] {
                GraphNode::File(target) => Some(target.clone()),
                GraphNode::External(_) => None,
            })
            .collect();
        out.sort();
        out
    }

    pub fn stats(&self) -> DependencyStats {
        DependencyStats {
            file_count: self.file_index.len(),
            dependency_count: self.dependency_index.len(),
            edge_count: self.graph.edge_count(),
            error_count: self.errors.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::classify;

    #[test]
    fn test_nodes_are_deduplicated() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_file("https://deno.land/x/m@1/a.ts");
        assert_eq!(graph.add_file("https://deno.land/x/m@1/a.ts"), a);

        let key = classify("https://esm.sh/preact@10.0.0");
        let dep = graph.add_dependency(key.clone());
        assert_eq!(graph.add_dependency(key), dep);

        graph.add_edge(a, dep, ImportKind::TypeOnly);
        graph.add_edge(a, dep, ImportKind::Value);
        let stats = graph.stats();
        assert_eq!(stats.file_count, 1);
        assert_eq!(stats.dependency_count, 1);
        assert_eq!(stats.edge_count, 1);
    }

    #[test]
    fn test_dependents_are_sorted_files() {
        let mut graph = DependencyGraph::new();
        let b = graph.add_file("https://deno.land/x/m@1/b.ts");
        let a = graph.add_file("https://deno.land/x/m@1/a.ts");
        let dep = graph.add_dependency(classify("node:fs"));
        graph.add_edge(b, dep, ImportKind::Value);
        graph.add_edge(a, dep, ImportKind::Value);
        graph.add_edge(a, b, ImportKind::Value);

        let deps = graph.dependencies();
        assert_eq!(deps.len(), 1);
        let dependents: Vec<&String> = deps[0].dependents.iter().collect();
        assert_eq!(
            dependents,
            vec!["https://deno.land/x/m@1/a.ts", "https://deno.land/x/m@1/b.ts"]
        );
        assert_eq!(
            graph.imports_of("https://deno.land/x/m@1/a.ts"),
            vec!["https://deno.land/x/m@1/b.ts"]
        );
    }

    #[test]
    fn test_first_error_per_specifier_wins() {
        let mut graph = DependencyGraph::new();
        graph.record_error("./missing.ts", "not found");
        graph.record_error("./missing.ts", "still not found");
        graph.record_error("bare", "relative import path");
        let errors = graph.errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].specifier, "./missing.ts");
        assert_eq!(errors[0].error, "not found");
    }
}
