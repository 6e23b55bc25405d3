//! The task handler behind the registry's queue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::services::Services;
use crate::deps::{analysis_mutations, needs_analysis, DependencyAnalyzer};
use crate::doc::DocNode;
use crate::error::Result;
use crate::scheduler::{Task, TaskHandler};
use crate::search::{search_objects, source_id, SearchFilter};
use crate::store::{kinds, with_timeout, Key, ModuleEntry, Mutation, Query};
use crate::views::{
    nav_index_key, path_completions_key, read_view, symbol_index_key, view_record, NavIndex,
    PathCompletions, SymbolIndex,
};

/// Version property holding the last search upload time (RFC 3339).
pub const SEARCH_UPLOADED_AT: &str = "search_uploaded_at";

pub struct RegistryWorker {
    services: Services,
}

#[async_trait]
impl TaskHandler for RegistryWorker {
    async fn handle(&self, task: Task) -> Result<()> {
        match task {
            Task::Commit { label, mutations } => {
                let summary = self.services.commit_now(&mutations).await?;
                debug!(label, applied = summary.applied, calls = summary.calls, "commit task done");
                Ok(())
            }
            Task::RegenerateNavIndex {
                module,
                version,
                path,
            } => self.regenerate_nav_index(&module, &version, &path).await,
            Task::RegenerateSymbolIndex { module, version } => {
                self.regenerate_symbol_index(&module, &version).await
            }
            Task::UploadToSearch {
                module,
                version,
                force,
            } => self.upload_to_search(&module, &version, force).await,
            Task::LoadModule { module, version } => self.load_module(&module, &version).await,
            Task::AnalyzeDependencies {
                module,
                version,
                force,
            } => self.analyze_dependencies(&module, &version, force).await,
        }
    }
}

impl RegistryWorker {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    async fn regenerate_nav_index(&self, module: &str, version: &str, path: &str) -> Result<()> {
        let nodes = self.doc_nodes_or_generate(module, version, path).await?;
        let nav = NavIndex::build(path, &nodes);
        self.persist_view(nav_index_key(module, version, path), &nav)
            .await
    }

    async fn regenerate_symbol_index(&self, module: &str, version: &str) -> Result<()> {
        self.services.require_version(module, version).await?;
        let index = self.services.build_symbol_index(module, version).await?;
        info!(module, version, symbols = index.len(), "symbol index rebuilt");
        self.persist_view(symbol_index_key(module, version), &index)
            .await
    }

    async fn upload_to_search(&self, module: &str, version: &str, force: bool) -> Result<()> {
        let mut record = self.services.require_version(module, version).await?;
        let dedup_days = self.services.config.jobs.search_dedup_days;
        if !force {
            if let Some(uploaded_at) = record
                .get_str(SEARCH_UPLOADED_AT)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            {
                let age = Utc::now() - uploaded_at.with_timezone(&Utc);
                if age < chrono::Duration::days(dedup_days) {
                    info!(
                        module,
                        version,
                        uploaded_at = %uploaded_at,
                        "search upload skipped, uploaded recently"
                    );
                    return Ok(());
                }
            }
        }

        let index: SymbolIndex = match self
            .services
            .lookup_one(&symbol_index_key(module, version))
            .await?
        {
            Some(stored) => read_view(&stored)?,
            None => self.services.build_symbol_index(module, version).await?,
        };
        let source = source_id(module, version);
        let objects = search_objects(&source, &index);
        let timeout = self.services.config.store_timeout();

        let removed = with_timeout(
            timeout,
            "search delete",
            self.services
                .search
                .delete_by_filter(&SearchFilter::source(&source)),
        )
        .await?;
        let written = with_timeout(timeout, "search upsert", self.services.search.upsert(objects))
            .await?;

        record.set(SEARCH_UPLOADED_AT, Utc::now().to_rfc3339());
        self.services
            .commit_now(&[Mutation::Upsert(record)])
            .await?;
        info!(module, version, removed, written, "search upload complete");
        Ok(())
    }

    async fn load_module(&self, module: &str, version: &str) -> Result<()> {
        self.services.require_version(module, version).await?;
        let entries = self.services.entries(module, version).await?;
        let documentable: Vec<&ModuleEntry> =
            entries.iter().filter(|e| e.is_documentable()).collect();

        let limit = self.services.config.jobs.max_modules_to_document;
        if documentable.len() > limit {
            warn!(
                module,
                version,
                files = documentable.len(),
                limit,
                "too many files to document, skipping"
            );
            return Ok(());
        }

        let mut mutations = Vec::new();
        let (mut documented, mut existing, mut failed) = (0usize, 0usize, 0usize);
        for entry in documentable {
            if self
                .services
                .has_doc_nodes(module, version, &entry.path)
                .await?
            {
                existing += 1;
                continue;
            }
            match self
                .services
                .generate_doc_nodes(module, version, &entry.path)
                .await
            {
                Ok((_, records)) => {
                    mutations.extend(records);
                    documented += 1;
                }
                Err(err) => {
                    warn!(module, version, path = %entry.path, error = %err, "documentation failed");
                    failed += 1;
                }
            }
        }
        self.services.commit_now(&mutations).await?;

        let completions = PathCompletions::build(module, version, &entries);
        self.persist_view(path_completions_key(module, version), &completions)
            .await?;
        self.services.queue.enqueue(Task::RegenerateSymbolIndex {
            module: module.to_string(),
            version: version.to_string(),
        })?;

        info!(module, version, documented, existing, failed, "module loaded");
        Ok(())
    }

    async fn analyze_dependencies(&self, module: &str, version: &str, force: bool) -> Result<()> {
        let record = self.services.require_version(module, version).await?;
        let format = self.services.config.analysis.format.clone();
        if !needs_analysis(Some(&record), &format, force) {
            info!(module, version, format = %format, "dependency analysis already current");
            return Ok(());
        }

        let scope = self.services.scope(module, version);
        let roots: Vec<String> = self
            .services
            .entries(module, version)
            .await?
            .iter()
            .filter(|e| e.is_documentable())
            .map(|e| scope.specifier_for(&e.path))
            .collect();

        let graph = DependencyAnalyzer::new(
            self.services.graph_builder.as_ref(),
            self.services.loader.as_ref(),
        )
        .with_import_map(self.services.import_map.as_deref())
        .analyze(&scope, &roots)
        .await?;

        let version_key = record.key.clone();
        let mut existing = self
            .services
            .query(Query::kind(kinds::MODULE_DEPENDENCY).has_ancestor(version_key.clone()))
            .await?;
        existing.extend(
            self.services
                .query(Query::kind(kinds::DEPENDENCY_ERROR).has_ancestor(version_key))
                .await?,
        );

        let mutations = analysis_mutations(record, &scope, &graph, &existing, &format)?;
        self.services.commit_now(&mutations).await?;
        Ok(())
    }

    /// Stored nodes, or freshly generated ones committed now.
    async fn doc_nodes_or_generate(
        &self,
        module: &str,
        version: &str,
        path: &str,
    ) -> Result<Vec<DocNode>> {
        if let Some(nodes) = self
            .services
            .stored_doc_nodes(module, version, path)
            .await?
        {
            return Ok(nodes);
        }
        let (nodes, mutations) = self
            .services
            .generate_doc_nodes(module, version, path)
            .await?;
        self.services.commit_now(&mutations).await?;
        Ok(nodes)
    }

    async fn persist_view<T: Serialize + Sync>(&self, key: Key, view: &T) -> Result<()> {
        let limit = self.services.config.store.max_entity_size;
        if let Some(record) = view_record(key, view, limit)? {
            self.services
                .commit_now(&[Mutation::Upsert(record)])
                .await?;
        }
        Ok(())
    }
}
