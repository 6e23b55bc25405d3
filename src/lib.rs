//! # Docstore
//!
//! Documentation storage for a module registry.
//!
//! Docstore persists API documentation trees in a hierarchical key-value
//! entity store, derives navigation and search views from them, and
//! annotates published module versions with their external dependencies.
//! Writes and view regeneration run on a sequential background queue.
//!
//! ## Key Features
//!
//! - **Tree codec**: one record per documentation node, addressed by ancestor keys
//! - **Declaration merging**: split namespaces and interfaces read back as one symbol
//! - **Dependency analysis**: import walking with source classification
//! - **Background jobs**: FIFO queue with one job in flight and fault isolation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docstore::{DocCodec, MemoryStore, parse_doc_nodes, store};
//!
//! # async fn demo() -> docstore::Result<()> {
//! let nodes = parse_doc_nodes(r#"[{"kind": "function", "name": "serve", "functionDef": {}}]"#)?;
//! let base = store::entry_key("oak", "v12.6.0", "/mod.ts");
//! let records = DocCodec::default().encode(&nodes, &base)?;
//!
//! let db = MemoryStore::new();
//! let mutations: Vec<_> = records.into_iter().map(store::Mutation::Upsert).collect();
//! store::commit(&db, &mutations, 500).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod deps;
pub mod doc;
pub mod error;
pub mod fetch;
pub mod registry;
pub mod scheduler;
pub mod search;
pub mod store;
pub mod views;

// Re-exports for convenience
pub use config::DocConfig;
pub use error::{DocError, FaultKind, Result};

pub use deps::{
    classify, Dependency, DependencyAnalyzer, DependencyError, DependencyGraph, DependencyKey,
    ImportMap, ImportScanner, ModuleGraphBuilder, ModuleScope,
};
pub use doc::{find_symbol, merge, parse_doc_nodes, DocCodec, DocNode, DocNodeKind};
pub use fetch::{CachingLoader, FetchCache, HttpFetcher, LoadResponse, Loader, MemoryFetcher};
pub use registry::{DocExtractor, MemoryExtractor, Registry, RegistryWorker, Services};
pub use scheduler::{QueueState, Task, TaskHandler, TaskQueue};
pub use search::{search_objects, MemorySearchIndex, SearchIndex, SearchObject};
pub use store::{EntityStore, Key, MemoryStore, ModuleEntry};
pub use views::{NavIndex, PathCompletions, SymbolIndex};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use store::{commit, entry_key, kinds, Mutation, Query};

    fn oak_docs() -> Vec<DocNode> {
        parse_doc_nodes(
            &json!([
                {"kind": "interface", "name": "Options", "interfaceDef": {
                    "properties": [{"name": "port"}]
                }},
                {"kind": "namespace", "name": "Status", "namespaceDef": {"elements": [
                    {"kind": "variable", "name": "OK", "variableDef": {}},
                    {"kind": "namespace", "name": "Inner", "namespaceDef": {"elements": [
                        {"kind": "function", "name": "deep", "functionDef": {}}
                    ]}}
                ]}},
                {"kind": "interface", "name": "Options", "jsDoc": {"doc": "Server options."}, "interfaceDef": {
                    "properties": [{"name": "hostname"}]
                }},
                {"kind": "namespace", "name": "Status", "namespaceDef": {"elements": [
                    {"kind": "variable", "name": "Created", "variableDef": {}}
                ]}}
            ])
            .to_string(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_tree_survives_partial_batches() {
        let base = entry_key("oak", "v12.6.0", "/mod.ts");
        let records = DocCodec::default().encode(&oak_docs(), &base).unwrap();
        assert_eq!(records.len(), 8);

        // The store applies at most three mutations per call.
        let db = MemoryStore::new().with_max_batch(3);
        let mutations: Vec<Mutation> = records.into_iter().map(Mutation::Upsert).collect();
        let summary = commit(&db, &mutations, 5).await.unwrap();
        assert_eq!(summary.applied, 8);
        assert_eq!(summary.calls, 3);

        let stored = db
            .query(Query::kind(kinds::DOC_NODE).has_ancestor(base.clone()))
            .await
            .unwrap();
        let nodes = merge(DocCodec::default().decode(&stored, &base).unwrap());

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].name, "Options");
        assert_eq!(nodes[0].doc_text(), Some("Server options."));
        let status: Vec<&str> = nodes[1].elements().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(status, vec!["OK", "Inner", "Created"]);
        assert_eq!(find_symbol(&nodes, "Status.Inner.deep").len(), 1);
    }

    #[tokio::test]
    async fn test_sibling_entries_do_not_leak() {
        let codec = DocCodec::default();
        let a = entry_key("oak", "v12.6.0", "/a.ts");
        let ab = entry_key("oak", "v12.6.0", "/a.ts.bak");
        let db = MemoryStore::new();

        let mut mutations = Vec::new();
        for (key, docs) in [(&a, oak_docs()), (&ab, Vec::new())] {
            for record in codec.encode(&docs, key).unwrap() {
                mutations.push(Mutation::Upsert(record));
            }
        }
        commit(&db, &mutations, 100).await.unwrap();

        let empty = db
            .query(Query::kind(kinds::DOC_NODE).has_ancestor(ab.clone()))
            .await
            .unwrap();
        assert_eq!(empty.len(), 1);
        assert!(codec.decode(&empty, &ab).unwrap().is_empty());

        let full = db
            .query(Query::kind(kinds::DOC_NODE).has_ancestor(a.clone()))
            .await
            .unwrap();
        assert_eq!(full.len(), 8);
    }

    #[test]
    fn test_fault_classification() {
        assert_eq!(DocError::NotFound("x".into()).fault(), FaultKind::NotFound);
        assert_eq!(DocError::store("down").fault(), FaultKind::Store);
    }
}
