//! Dependency analysis of published module versions.
//!
//! Starting from a version's root files, the analyzer walks imports that
//! stay inside the version and records everything else as an external
//! dependency, classified by hosting source.

pub mod analyzer;
pub mod graph;
pub mod import_map;
pub mod scanner;
pub mod source;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub use analyzer::{analysis_mutations, needs_analysis, DependencyAnalyzer, ANALYSIS_MARKER};
pub use graph::{DependencyGraph, DependencyStats, ImportKind};
pub use import_map::ImportMap;
pub use scanner::ImportScanner;
pub use source::{classify, ModuleScope, OTHER_SOURCE};

use crate::error::Result;
use crate::fetch::Loader;

/// Identity of an external dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyKey {
    pub source: String,
    pub org: Option<String>,
    pub pkg: String,
    pub version: Option<String>,
}

impl DependencyKey {
    /// Stable record id: `source:org:pkg:version` with empty parts for absent fields.
    pub fn id(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.source,
            self.org.as_deref().unwrap_or(""),
            self.pkg,
            self.version.as_deref().unwrap_or("")
        )
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.source)?;
        if let Some(org) = &self.org {
            write!(f, "{}/", org)?;
        }
        write!(f, "{}", self.pkg)?;
        if let Some(version) = &self.version {
            write!(f, "@{}", version)?;
        }
        Ok(())
    }
}

/// An external dependency and the internal files that import it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    #[serde(flatten)]
    pub key: DependencyKey,
    pub dependents: BTreeSet<String>,
}

/// A specifier that could not be resolved or loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyError {
    pub specifier: String,
    pub error: String,
}

/// One import found in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEdge {
    /// The specifier as written.
    pub specifier: String,
    /// Resolved absolute specifier, or the resolution error message.
    pub resolved: std::result::Result<String, String>,
    pub type_only: bool,
}

/// Produces the import edges of a single file.
#[async_trait]
pub trait ModuleGraphBuilder: Send + Sync {
    async fn edges(
        &self,
        specifier: &str,
        loader: &dyn Loader,
        import_map: Option<&ImportMap>,
    ) -> Result<Vec<ImportEdge>>;
}
