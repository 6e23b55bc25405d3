//! Registry operations over the entity store.
//!
//! Reads are served from stored records when present. Anything computed
//! on a request path is returned immediately and persisted through the
//! task queue.

pub mod extract;
pub mod services;
pub mod worker;

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub use extract::{DocExtractor, MemoryExtractor};
pub use services::Services;
pub use worker::{RegistryWorker, SEARCH_UPLOADED_AT};

use crate::doc::{find_symbol, DocNode};
use crate::error::{DocError, Result};
use crate::scheduler::{Task, TaskReceiver};
use crate::store::{
    entry_key, module_key, validate_path, version_key, Entity, EntryKind, Key, ModuleEntry,
    Mutation,
};
use crate::views::{
    nav_index_key, path_completions_key, read_view, symbol_index_key, view_record, NavIndex,
    PathCompletions, SymbolIndex,
};

#[derive(Clone)]
pub struct Registry {
    services: Services,
}

impl Registry {
    /// A registry whose queue is drained elsewhere.
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Spawn the task worker and return the registry.
    pub fn start(services: Services, receiver: TaskReceiver) -> Self {
        receiver.spawn(Arc::new(RegistryWorker::new(services.clone())));
        Self::new(services)
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn enqueue(&self, task: Task) -> Result<Uuid> {
        self.services.queue.enqueue(task)
    }

    /// Resolves once queued work has drained.
    pub async fn wait_idle(&self) {
        self.services.queue.wait_idle().await
    }

    // ─── Documentation ──────────────────────────────────────────

    /// Documentation of one entry. Generated on first request; the records
    /// are committed in the background.
    pub async fn doc_nodes(&self, module: &str, version: &str, path: &str) -> Result<Vec<DocNode>> {
        validate_path(path)?;
        if let Some(nodes) = self.services.stored_doc_nodes(module, version, path).await? {
            return Ok(nodes);
        }

        let entry: ModuleEntry = self
            .services
            .lookup_one(&entry_key(module, version, path))
            .await?
            .ok_or_else(|| {
                DocError::NotFound(format!("{}@{}{} does not exist", module, version, path))
            })?
            .deserialize()?;
        if entry.kind != EntryKind::File {
            return Err(DocError::BadRequest(format!(
                "{}@{}{} is a directory",
                module, version, path
            )));
        }

        let (nodes, mutations) = self
            .services
            .generate_doc_nodes(module, version, path)
            .await?;
        debug!(module, version, path, records = mutations.len(), "documentation generated");
        self.enqueue(Task::commit(
            format!("doc_nodes {}@{}{}", module, version, path),
            mutations,
        ))?;
        Ok(nodes)
    }

    /// Declarations reachable by a dotted name such as `Status.OK`.
    pub async fn symbol(
        &self,
        module: &str,
        version: &str,
        path: &str,
        name: &str,
    ) -> Result<Vec<DocNode>> {
        let nodes = self.doc_nodes(module, version, path).await?;
        let found: Vec<DocNode> = find_symbol(&nodes, name).into_iter().cloned().collect();
        if found.is_empty() {
            return Err(DocError::NotFound(format!(
                "symbol \"{}\" not found in {}@{}{}",
                name, module, version, path
            )));
        }
        Ok(found)
    }

    // ─── Derived Views ──────────────────────────────────────────

    pub async fn nav_index(&self, module: &str, version: &str, path: &str) -> Result<NavIndex> {
        validate_path(path)?;
        let key = nav_index_key(module, version, path);
        if let Some(stored) = self.services.lookup_one(&key).await? {
            return read_view(&stored);
        }
        let nodes = self.doc_nodes(module, version, path).await?;
        let nav = NavIndex::build(path, &nodes);
        self.persist_view(key, &nav, "nav_index")?;
        Ok(nav)
    }

    pub async fn symbol_index(&self, module: &str, version: &str) -> Result<SymbolIndex> {
        let key = symbol_index_key(module, version);
        if let Some(stored) = self.services.lookup_one(&key).await? {
            return read_view(&stored);
        }
        self.services.require_version(module, version).await?;
        let index = self.services.build_symbol_index(module, version).await?;
        self.persist_view(key, &index, "symbol_index")?;
        Ok(index)
    }

    pub async fn path_completions(&self, module: &str, version: &str) -> Result<PathCompletions> {
        let key = path_completions_key(module, version);
        if let Some(stored) = self.services.lookup_one(&key).await? {
            return read_view(&stored);
        }
        self.services.require_version(module, version).await?;
        let entries = self.services.entries(module, version).await?;
        let completions = PathCompletions::build(module, version, &entries);
        self.persist_view(key, &completions, "path_completions")?;
        Ok(completions)
    }

    fn persist_view<T: Serialize>(&self, key: Key, view: &T, label: &str) -> Result<()> {
        let limit = self.services.config.store.max_entity_size;
        if let Some(record) = view_record(key, view, limit)? {
            self.enqueue(Task::commit(label, vec![Mutation::Upsert(record)]))?;
        }
        Ok(())
    }

    // ─── Ingestion ──────────────────────────────────────────────

    /// Queue the records of a newly published version.
    pub fn register_version(
        &self,
        module: &str,
        version: &str,
        entries: &[ModuleEntry],
    ) -> Result<Uuid> {
        for entry in entries {
            validate_path(&entry.path)?;
        }

        let now = chrono::Utc::now().to_rfc3339();
        let mut mutations = vec![
            Mutation::Upsert(Entity::new(module_key(module)).with("name", module)),
            Mutation::Upsert(
                Entity::new(version_key(module, version))
                    .with("module", module)
                    .with("version", version)
                    .with("registered_at", now),
            ),
        ];
        for entry in entries {
            mutations.push(Mutation::Upsert(Entity::from_serializable(
                entry_key(module, version, &entry.path),
                entry,
            )?));
        }
        self.enqueue(Task::commit(
            format!("register {}@{}", module, version),
            mutations,
        ))
    }
}

#[cfg(test)]
mod tests;
