//! Size-bounded cache of fetched source text.
//!
//! Entries are kept in insertion order. When the cumulative byte size
//! exceeds the ceiling the oldest entries are evicted. The ceiling is not
//! checked on every insert: an insert schedules one deferred check on the
//! runtime, so a burst of inserts is trimmed once.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use super::LoadResponse;

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, LoadResponse>,
    order: VecDeque<String>,
    bytes: usize,
    check_pending: bool,
}

#[derive(Debug, Clone)]
pub struct FetchCache {
    state: Arc<Mutex<CacheState>>,
    max_bytes: usize,
}

impl FetchCache {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            max_bytes,
        }
    }

    pub fn get(&self, specifier: &str) -> Option<LoadResponse> {
        self.lock().entries.get(specifier).cloned()
    }

    pub fn insert(&self, specifier: &str, response: LoadResponse) {
        let schedule = {
            let mut state = self.lock();
            if let Some(old) = state.entries.remove(specifier) {
                state.bytes -= old.size();
                state.order.retain(|s| s != specifier);
            }
            state.bytes += response.size();
            state.entries.insert(specifier.to_string(), response);
            state.order.push_back(specifier.to_string());

            let schedule = !state.check_pending;
            state.check_pending = true;
            schedule
        };

        if schedule {
            self.schedule_check();
        }
    }

    fn schedule_check(&self) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let cache = self.clone();
                handle.spawn(async move {
                    tokio::task::yield_now().await;
                    cache.enforce_ceiling();
                });
            }
            // Outside a runtime there is no later turn to defer to.
            Err(_) => {
                self.enforce_ceiling();
            }
        }
    }

    /// Evict oldest entries until the cache fits. Returns the number evicted.
    pub fn enforce_ceiling(&self) -> usize {
        let mut state = self.lock();
        state.check_pending = false;
        let mut evicted = 0;
        while state.bytes > self.max_bytes {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            if let Some(entry) = state.entries.remove(&oldest) {
                state.bytes -= entry.size();
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!(
                evicted,
                bytes = state.bytes,
                limit = self.max_bytes,
                "fetch cache trimmed"
            );
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_bytes(&self) -> usize {
        self.lock().bytes
    }

    pub fn contains(&self, specifier: &str) -> bool {
        self.lock().entries.contains_key(specifier)
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(specifier: &str, bytes: usize) -> LoadResponse {
        LoadResponse::new(specifier, "a".repeat(bytes))
    }

    #[tokio::test]
    async fn test_eviction_is_deferred_then_oldest_first() {
        let cache = FetchCache::new(100);
        cache.insert("a", response("a", 40));
        cache.insert("b", response("b", 40));
        cache.insert("c", response("c", 40));

        // Nothing evicted synchronously.
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.total_bytes(), 120);

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
        assert_eq!(cache.total_bytes(), 80);
    }

    #[test]
    fn test_enforce_without_runtime() {
        let cache = FetchCache::new(50);
        cache.insert("a", response("a", 30));
        cache.insert("b", response("b", 30));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("b"));
    }

    #[tokio::test]
    async fn test_replace_updates_size_and_order() {
        let cache = FetchCache::new(100);
        cache.insert("a", response("a", 30));
        cache.insert("b", response("b", 30));
        cache.insert("a", response("a", 10));
        assert_eq!(cache.total_bytes(), 40);
        cache.insert("c", response("c", 70));
        assert_eq!(cache.enforce_ceiling(), 1);
        // "b" is now the oldest entry.
        assert!(!cache.contains("b"));
        assert!(cache.contains("a"));
    }

    #[tokio::test]
    async fn test_single_oversized_entry_is_dropped() {
        let cache = FetchCache::new(10);
        cache.insert("big", response("big", 11));
        cache.enforce_ceiling();
        assert!(cache.is_empty());
        assert_eq!(cache.total_bytes(), 0);
    }
}
