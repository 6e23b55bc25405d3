//! Loading remote source text.
//!
//! The documentation extractor and the import scanner pull sources through
//! a [`Loader`]. [`CachingLoader`] puts a [`FetchCache`] in front of a
//! [`Fetcher`] so each specifier is fetched once per cache lifetime.

pub mod cache;
pub mod http;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub use cache::FetchCache;
pub use http::HttpFetcher;

use crate::error::Result;
use crate::store::with_timeout;

/// A fetched module source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResponse {
    /// Final specifier after redirects.
    pub specifier: String,
    pub content: Arc<str>,
    pub headers: HashMap<String, String>,
}

impl LoadResponse {
    pub fn new(specifier: &str, content: impl Into<Arc<str>>) -> Self {
        Self {
            specifier: specifier.to_string(),
            content: content.into(),
            headers: HashMap::new(),
        }
    }

    /// Bytes counted against the cache ceiling.
    pub fn size(&self) -> usize {
        self.content.len()
            + self
                .headers
                .iter()
                .map(|(k, v)| k.len() + v.len())
                .sum::<usize>()
    }
}

/// Caller-supplied load hook. `Ok(None)` means the specifier does not exist.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, specifier: &str) -> Result<Option<LoadResponse>>;
}

/// Remote source fetcher.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, specifier: &str) -> Result<Option<LoadResponse>>;
}

/// Cache-first loader.
pub struct CachingLoader<F> {
    fetcher: F,
    cache: FetchCache,
}

impl<F: Fetcher> CachingLoader<F> {
    pub fn new(fetcher: F, cache: FetchCache) -> Self {
        Self { fetcher, cache }
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }
}

#[async_trait]
impl<F: Fetcher> Loader for CachingLoader<F> {
    async fn load(&self, specifier: &str) -> Result<Option<LoadResponse>> {
        if let Some(hit) = self.cache.get(specifier) {
            debug!(specifier, "fetch cache hit");
            return Ok(Some(hit));
        }
        let response = self.fetcher.fetch(specifier).await?;
        if let Some(response) = &response {
            self.cache.insert(specifier, response.clone());
        }
        Ok(response)
    }
}

/// Applies a deadline to every load of the wrapped loader.
pub struct TimeoutLoader {
    inner: Arc<dyn Loader>,
    limit: Duration,
}

impl TimeoutLoader {
    pub fn new(inner: Arc<dyn Loader>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl Loader for TimeoutLoader {
    async fn load(&self, specifier: &str) -> Result<Option<LoadResponse>> {
        with_timeout(self.limit, "load", self.inner.load(specifier)).await
    }
}

/// Serves sources from memory. Useful for tests and offline runs.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    sources: HashMap<String, String>,
    fetches: AtomicUsize,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, specifier: &str, content: &str) -> Self {
        self.sources
            .insert(specifier.to_string(), content.to_string());
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, specifier: &str) -> Result<Option<LoadResponse>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .sources
            .get(specifier)
            .map(|content| LoadResponse::new(specifier, content.as_str())))
    }
}

#[async_trait]
impl Fetcher for Arc<MemoryFetcher> {
    async fn fetch(&self, specifier: &str) -> Result<Option<LoadResponse>> {
        self.as_ref().fetch(specifier).await
    }
}

#[async_trait]
impl Loader for MemoryFetcher {
    async fn load(&self, specifier: &str) -> Result<Option<LoadResponse>> {
        self.fetch(specifier).await
    }
}
