//! In-memory entity store.
//!
//! Mirrors the semantics of the hosted store closely enough for tests and
//! local runs: ancestor queries include the ancestor itself, commits are
//! non-transactional, and a batch cap can force partial commits.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::entity::{BatchResult, Entity, Mutation, Query};
use super::key::Key;
use super::EntityStore;
use crate::error::{DocError, Result};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entities: Mutex<BTreeMap<Key, Entity>>,
    max_batch: Option<usize>,
    fail_commits: AtomicBool,
    commit_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply at most `n` mutations per commit call.
    pub fn with_max_batch(mut self, n: usize) -> Self {
        self.max_batch = Some(n.max(1));
        self
    }

    /// Make every following commit call reject its mutations.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    pub fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entities.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &Key) -> Option<Entity> {
        self.entities.lock().ok()?.get(key).cloned()
    }

    /// Every stored entity in key order.
    pub fn snapshot(&self) -> Vec<Entity> {
        self.entities
            .lock()
            .map(|e| e.values().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<Key, Entity>>> {
        self.entities
            .lock()
            .map_err(|e| DocError::store(format!("memory store lock poisoned: {}", e)))
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn lookup(&self, keys: &[Key]) -> Result<Vec<Entity>> {
        let entities = self.lock()?;
        Ok(keys
            .iter()
            .filter_map(|key| entities.get(key).cloned())
            .collect())
    }

    async fn query(&self, query: Query) -> Result<Vec<Entity>> {
        let entities = self.lock()?;
        let limit = query.limit.unwrap_or(usize::MAX);
        let found = match &query.ancestor {
            // Descendants are contiguous after their ancestor in key order.
            Some(ancestor) => entities
                .range(ancestor.clone()..)
                .take_while(|(key, _)| key.starts_with(ancestor))
                .map(|(_, entity)| entity)
                .filter(|entity| query.matches(entity))
                .take(limit)
                .cloned()
                .collect(),
            None => entities
                .values()
                .filter(|entity| query.matches(entity))
                .take(limit)
                .cloned()
                .collect(),
        };
        Ok(found)
    }

    async fn commit_batch(&self, mutations: &[Mutation]) -> Result<BatchResult> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_commits.load(Ordering::SeqCst) {
            return Ok(BatchResult {
                applied: 0,
                failures: mutations
                    .iter()
                    .map(|m| format!("{}: commit rejected", m.key()))
                    .collect(),
            });
        }

        let take = self.max_batch.unwrap_or(usize::MAX).min(mutations.len());
        let mut entities = self.lock()?;
        for mutation in &mutations[..take] {
            match mutation {
                Mutation::Upsert(entity) => {
                    entities.insert(entity.key.clone(), entity.clone());
                }
                Mutation::Delete(key) => {
                    entities.remove(key);
                }
            }
        }
        Ok(BatchResult {
            applied: take,
            failures: Vec::new(),
        })
    }
}
