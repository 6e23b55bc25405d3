//! Entity store contract.
//!
//! The store is an external hierarchical key-value service. This module
//! defines the narrow interface docstore needs from it, the key layout of
//! every record kind, and an in-memory implementation.

pub mod commit;
pub mod entity;
pub mod key;
pub mod memory;
pub mod records;

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

pub use commit::{commit, CommitSummary};
pub use entity::{BatchResult, Entity, Filter, FilterOp, Mutation, Query};
pub use key::{descendant_not_child, is_ancestor, is_child, keys_equal, Id, Key, PathElement};
pub use memory::MemoryStore;
pub use records::{validate_path, EntryKind, ModuleEntry};

use crate::error::{DocError, Result};

/// Record kinds (logical tables).
pub mod kinds {
    pub const MODULE: &str = "module";
    pub const MODULE_VERSION: &str = "module_version";
    pub const MODULE_ENTRY: &str = "module_entry";
    pub const DOC_NODE: &str = "doc_node";
    pub const MODULE_DEPENDENCY: &str = "module_dependency";
    pub const DEPENDENCY_ERROR: &str = "dependency_error";
    pub const NAV_INDEX: &str = "nav_index";
    pub const SYMBOL_INDEX: &str = "symbol_index";
    pub const PATH_COMPLETIONS: &str = "path_completions";
}

/// Hierarchical key-value store with ancestor queries and batched writes.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Fetch the entities that exist among `keys`.
    async fn lookup(&self, keys: &[Key]) -> Result<Vec<Entity>>;

    /// Run a kind query, in key order.
    async fn query(&self, query: Query) -> Result<Vec<Entity>>;

    /// Apply one non-transactional batch. The store may apply only a prefix.
    async fn commit_batch(&self, mutations: &[Mutation]) -> Result<BatchResult>;
}

pub fn module_key(module: &str) -> Key {
    Key::root(kinds::MODULE, module)
}

pub fn version_key(module: &str, version: &str) -> Key {
    module_key(module).child(kinds::MODULE_VERSION, version)
}

pub fn entry_key(module: &str, version: &str, path: &str) -> Key {
    version_key(module, version).child(kinds::MODULE_ENTRY, path)
}

/// Run a collaborator call with a deadline.
pub async fn with_timeout<T, F>(limit: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(DocError::Timeout {
            operation: operation.to_string(),
            elapsed: limit,
        }),
    }
}
