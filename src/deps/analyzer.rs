//! Walking a module version's imports and persisting the result.

use std::collections::{HashSet, VecDeque};
use tracing::{debug, info};

use super::graph::{DependencyGraph, ImportKind};
use super::import_map::ImportMap;
use super::source::{classify, ModuleScope};
use super::ModuleGraphBuilder;
use crate::error::{DocError, Result};
use crate::fetch::Loader;
use crate::store::{kinds, Entity, Mutation};

/// Property on the module-version record holding the analysis format.
pub const ANALYSIS_MARKER: &str = "analysis_format";

pub struct DependencyAnalyzer<'a> {
    builder: &'a dyn ModuleGraphBuilder,
    loader: &'a dyn Loader,
    import_map: Option<&'a ImportMap>,
}

impl<'a> DependencyAnalyzer<'a> {
    pub fn new(builder: &'a dyn ModuleGraphBuilder, loader: &'a dyn Loader) -> Self {
        Self {
            builder,
            loader,
            import_map: None,
        }
    }

    pub fn with_import_map(mut self, import_map: Option<&'a ImportMap>) -> Self {
        self.import_map = import_map;
        self
    }

    /// Walk every file reachable from `roots` without leaving `scope`.
    ///
    /// Each file is visited once per call. Resolution and load failures are
    /// recorded in the graph; only timeouts abort the walk.
    pub async fn analyze(&self, scope: &ModuleScope, roots: &[String]) -> Result<DependencyGraph> {
        let mut graph = DependencyGraph::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut pending: VecDeque<String> = roots.iter().cloned().collect();

        while let Some(current) = pending.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let from = graph.add_file(&current);

            let edges = match self
                .builder
                .edges(&current, self.loader, self.import_map)
                .await
            {
                Ok(edges) => edges,
                Err(err @ DocError::Timeout { .. }) => return Err(err),
                Err(err) => {
                    debug!(specifier = %current, error = %err, "file could not be scanned");
                    graph.record_error(&current, err.to_string());
                    continue;
                }
            };

            for edge in edges {
                let kind = if edge.type_only {
                    ImportKind::TypeOnly
                } else {
                    ImportKind::Value
                };
                match edge.resolved {
                    Err(message) => graph.record_error(&edge.specifier, message),
                    Ok(resolved) if scope.contains(&resolved) => {
                        let to = graph.add_file(&resolved);
                        graph.add_edge(from, to, kind);
                        if !visited.contains(&resolved) {
                            pending.push_back(resolved);
                        }
                    }
                    Ok(resolved) => {
                        let to = graph.add_dependency(classify(&resolved));
                        graph.add_edge(from, to, kind);
                    }
                }
            }
        }

        let stats = graph.stats();
        info!(
            scope = scope.prefix(),
            files = stats.file_count,
            dependencies = stats.dependency_count,
            errors = stats.error_count,
            "dependency analysis complete"
        );
        Ok(graph)
    }
}

/// True unless the version already carries the current analysis format.
pub fn needs_analysis(version: Option<&Entity>, format: &str, force: bool) -> bool {
    force || version.and_then(|v| v.get_str(ANALYSIS_MARKER)) != Some(format)
}

/// Mutations that replace a version's stored analysis with `graph`.
///
/// `existing` holds the version's current dependency and error records;
/// those not reproduced by `graph` are deleted. The version record is
/// stamped with `format` last.
pub fn analysis_mutations(
    mut version: Entity,
    scope: &ModuleScope,
    graph: &DependencyGraph,
    existing: &[Entity],
    format: &str,
) -> Result<Vec<Mutation>> {
    let mut mutations = Vec::new();
    let mut written = HashSet::new();

    for mut dependency in graph.dependencies() {
        dependency.dependents = dependency
            .dependents
            .into_iter()
            .map(|s| scope.path_of(&s).unwrap_or(s))
            .collect();
        let key = version
            .key
            .child(kinds::MODULE_DEPENDENCY, dependency.key.id());
        written.insert(key.clone());
        mutations.push(Mutation::Upsert(Entity::from_serializable(key, &dependency)?));
    }

    for error in graph.errors() {
        let key = version
            .key
            .child(kinds::DEPENDENCY_ERROR, error.specifier.as_str());
        written.insert(key.clone());
        mutations.push(Mutation::Upsert(Entity::from_serializable(key, &error)?));
    }

    for stale in existing {
        let kind = stale.key.kind();
        if (kind == kinds::MODULE_DEPENDENCY || kind == kinds::DEPENDENCY_ERROR)
            && !written.contains(&stale.key)
        {
            mutations.push(Mutation::Delete(stale.key.clone()));
        }
    }

    version.set(ANALYSIS_MARKER, format);
    version.set("analyzed_at", chrono::Utc::now().to_rfc3339());
    mutations.push(Mutation::Upsert(version));
    Ok(mutations)
}
