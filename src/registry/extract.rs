//! The documentation engine boundary.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::doc::DocNode;
use crate::error::{DocError, Result};
use crate::fetch::Loader;

/// Produces the documentation tree of one source file.
#[async_trait]
pub trait DocExtractor: Send + Sync {
    async fn extract(&self, specifier: &str, loader: &dyn Loader) -> Result<Vec<DocNode>>;
}

/// Serves prepared trees keyed by specifier.
#[derive(Debug, Default)]
pub struct MemoryExtractor {
    docs: HashMap<String, Vec<DocNode>>,
    calls: AtomicUsize,
}

impl MemoryExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(mut self, specifier: &str, nodes: Vec<DocNode>) -> Self {
        self.docs.insert(specifier.to_string(), nodes);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocExtractor for MemoryExtractor {
    async fn extract(&self, specifier: &str, _loader: &dyn Loader) -> Result<Vec<DocNode>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.docs
            .get(specifier)
            .cloned()
            .ok_or_else(|| DocError::NotFound(format!("no documentation for {}", specifier)))
    }
}
