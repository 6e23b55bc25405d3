//! Collaborator handles shared by request paths and the task worker.

use std::sync::Arc;

use super::extract::DocExtractor;
use crate::config::DocConfig;
use crate::deps::{ImportMap, ModuleGraphBuilder, ModuleScope};
use crate::doc::{merge, DocCodec, DocNode};
use crate::error::{DocError, Result};
use crate::fetch::{Loader, TimeoutLoader};
use crate::scheduler::{TaskQueue, TaskReceiver};
use crate::search::SearchIndex;
use crate::store::{
    commit, entry_key, kinds, version_key, with_timeout, CommitSummary, Entity, EntityStore, Key,
    ModuleEntry, Mutation, Query,
};
use crate::views::SymbolIndex;

/// Constructed once at startup and passed explicitly.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<DocConfig>,
    pub store: Arc<dyn EntityStore>,
    pub search: Arc<dyn SearchIndex>,
    pub extractor: Arc<dyn DocExtractor>,
    pub graph_builder: Arc<dyn ModuleGraphBuilder>,
    /// Loader with the fetch deadline applied.
    pub loader: Arc<dyn Loader>,
    pub import_map: Option<Arc<ImportMap>>,
    pub queue: TaskQueue,
}

impl Services {
    /// Build the handles and the queue. The returned receiver becomes the
    /// worker once handed to [`Registry::start`](super::Registry::start).
    pub fn new(
        config: DocConfig,
        store: Arc<dyn EntityStore>,
        search: Arc<dyn SearchIndex>,
        extractor: Arc<dyn DocExtractor>,
        graph_builder: Arc<dyn ModuleGraphBuilder>,
        loader: Arc<dyn Loader>,
    ) -> (Self, TaskReceiver) {
        let (queue, receiver) = TaskQueue::channel();
        let loader: Arc<dyn Loader> = Arc::new(TimeoutLoader::new(loader, config.fetch_timeout()));
        let services = Self {
            config: Arc::new(config),
            store,
            search,
            extractor,
            graph_builder,
            loader,
            import_map: None,
            queue,
        };
        (services, receiver)
    }

    pub fn with_import_map(mut self, import_map: ImportMap) -> Self {
        self.import_map = Some(Arc::new(import_map));
        self
    }

    pub fn codec(&self) -> DocCodec {
        DocCodec::from_config(&self.config)
    }

    pub fn scope(&self, module: &str, version: &str) -> ModuleScope {
        ModuleScope::new(&self.config.analysis, module, version)
    }

    // ─── Store Access ───────────────────────────────────────────

    pub async fn lookup_one(&self, key: &Key) -> Result<Option<Entity>> {
        let found = with_timeout(
            self.config.store_timeout(),
            "store lookup",
            self.store.lookup(std::slice::from_ref(key)),
        )
        .await?;
        Ok(found.into_iter().next())
    }

    pub async fn query(&self, query: Query) -> Result<Vec<Entity>> {
        with_timeout(self.config.store_timeout(), "store query", self.store.query(query)).await
    }

    pub async fn commit_now(&self, mutations: &[Mutation]) -> Result<CommitSummary> {
        with_timeout(
            self.config.store_timeout(),
            "store commit",
            commit(self.store.as_ref(), mutations, self.config.store.batch_size),
        )
        .await
    }

    pub async fn require_version(&self, module: &str, version: &str) -> Result<Entity> {
        self.lookup_one(&version_key(module, version))
            .await?
            .ok_or_else(|| DocError::NotFound(format!("{}@{} is not registered", module, version)))
    }

    /// Entries of a version in path order.
    pub async fn entries(&self, module: &str, version: &str) -> Result<Vec<ModuleEntry>> {
        self.query(Query::kind(kinds::MODULE_ENTRY).has_ancestor(version_key(module, version)))
            .await?
            .iter()
            .map(Entity::deserialize)
            .collect()
    }

    // ─── Documentation ──────────────────────────────────────────

    /// Decoded and merged nodes of an entry, `None` when nothing is stored.
    pub async fn stored_doc_nodes(
        &self,
        module: &str,
        version: &str,
        path: &str,
    ) -> Result<Option<Vec<DocNode>>> {
        let base = entry_key(module, version, path);
        let records = self
            .query(Query::kind(kinds::DOC_NODE).has_ancestor(base.clone()))
            .await?;
        if records.is_empty() {
            return Ok(None);
        }
        Ok(Some(merge(self.codec().decode(&records, &base)?)))
    }

    pub async fn has_doc_nodes(&self, module: &str, version: &str, path: &str) -> Result<bool> {
        let query = Query::kind(kinds::DOC_NODE)
            .has_ancestor(entry_key(module, version, path))
            .limit(1);
        Ok(!self.query(query).await?.is_empty())
    }

    /// Run the extractor on an entry. Returns the merged nodes and the
    /// mutations that persist them.
    pub async fn generate_doc_nodes(
        &self,
        module: &str,
        version: &str,
        path: &str,
    ) -> Result<(Vec<DocNode>, Vec<Mutation>)> {
        let specifier = self.scope(module, version).specifier_for(path);
        let nodes = with_timeout(
            self.config.fetch_timeout(),
            "extract documentation",
            self.extractor.extract(&specifier, self.loader.as_ref()),
        )
        .await?;
        let records = self
            .codec()
            .encode(&nodes, &entry_key(module, version, path))?;
        let mutations = records.into_iter().map(Mutation::Upsert).collect();
        Ok((merge(nodes), mutations))
    }

    /// Symbol index over every entry with stored documentation.
    pub async fn build_symbol_index(&self, module: &str, version: &str) -> Result<SymbolIndex> {
        let mut index = SymbolIndex::new(module, version);
        for entry in self.entries(module, version).await? {
            if !entry.is_documentable() {
                continue;
            }
            if let Some(nodes) = self.stored_doc_nodes(module, version, &entry.path).await? {
                index.add_entry(&entry.path, &nodes);
            }
        }
        Ok(index)
    }
}
