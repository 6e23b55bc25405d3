//! Search index contract and the objects uploaded to it.
//!
//! Object ids are `{sourceId}:{path}:{name}:{sequence}`. The sequence
//! counts repeats of the same name within one path, so overloads and
//! merged declarations never overwrite each other.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::doc::{DeclarationKind, DocNodeKind};
use crate::error::{DocError, Result};
use crate::views::SymbolIndex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchObject {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub source_id: String,
    pub path: String,
    pub name: String,
    pub kind: DocNodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    pub declaration_kind: DeclarationKind,
}

/// Selects objects for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilter {
    pub source_id: String,
}

impl SearchFilter {
    pub fn source(source_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
        }
    }

    pub fn matches(&self, object: &SearchObject) -> bool {
        object.source_id == self.source_id
    }
}

/// External search service.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Insert or replace objects by id. Returns the number written.
    async fn upsert(&self, objects: Vec<SearchObject>) -> Result<usize>;

    /// Remove every object matching `filter`. Returns the number removed.
    async fn delete_by_filter(&self, filter: &SearchFilter) -> Result<usize>;
}

pub fn source_id(module: &str, version: &str) -> String {
    format!("{}@{}", module, version)
}

pub fn object_id(source_id: &str, path: &str, name: &str, sequence: usize) -> String {
    format!("{}:{}:{}:{}", source_id, path, name, sequence)
}

/// Search objects for every symbol of a version, in index order.
pub fn search_objects(source_id: &str, index: &SymbolIndex) -> Vec<SearchObject> {
    let mut sequences: HashMap<(&str, &str), usize> = HashMap::new();
    index
        .items
        .iter()
        .map(|item| {
            let sequence = sequences
                .entry((item.path.as_str(), item.name.as_str()))
                .or_insert(0);
            let object = SearchObject {
                object_id: object_id(source_id, &item.path, &item.name, *sequence),
                source_id: source_id.to_string(),
                path: item.path.clone(),
                name: item.name.clone(),
                kind: item.kind,
                doc: item.doc.clone(),
                declaration_kind: item.declaration_kind,
            };
            *sequence += 1;
            object
        })
        .collect()
}

/// In-process index keyed by object id.
#[derive(Debug, Default)]
pub struct MemorySearchIndex {
    objects: Mutex<BTreeMap<String, SearchObject>>,
    upserts: AtomicUsize,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, object_id: &str) -> Option<SearchObject> {
        self.lock().ok()?.get(object_id).cloned()
    }

    pub fn objects(&self) -> Vec<SearchObject> {
        self.lock()
            .map(|o| o.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of `upsert` calls served.
    pub fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, SearchObject>>> {
        self.objects
            .lock()
            .map_err(|e| DocError::Assertion(format!("search index lock poisoned: {}", e)))
    }
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn upsert(&self, objects: Vec<SearchObject>) -> Result<usize> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        let mut stored = self.lock()?;
        let count = objects.len();
        for object in objects {
            stored.insert(object.object_id.clone(), object);
        }
        Ok(count)
    }

    async fn delete_by_filter(&self, filter: &SearchFilter) -> Result<usize> {
        let mut stored = self.lock()?;
        let before = stored.len();
        stored.retain(|_, object| !filter.matches(object));
        Ok(before - stored.len())
    }
}
