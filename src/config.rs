//! Configuration loaded from `docstore.toml`.
//!
//! Every section is optional; a missing file yields the defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{DocError, Result};

/// Largest entity the store accepts, in bytes (1 MiB minus key overhead).
pub const DEFAULT_MAX_ENTITY_SIZE: usize = 1_048_487;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocConfig {
    pub store: StoreConfig,
    pub cache: CacheConfig,
    pub fetch: FetchConfig,
    pub analysis: AnalysisConfig,
    pub jobs: JobsConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub max_entity_size: usize,
    /// Mutations sent per commit call.
    pub batch_size: usize,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_entity_size: DEFAULT_MAX_ENTITY_SIZE,
            batch_size: 500,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Ceiling for cumulative cached source bytes.
    pub max_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: 64 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("docstore/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Marker stamped on analyzed versions. Bump to force re-analysis.
    pub format: String,
    /// Base URL under which third-party modules are published.
    pub registry_base: String,
    /// Base URL of the standard library.
    pub std_base: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            format: "1".to_string(),
            registry_base: "https://deno.land/x".to_string(),
            std_base: "https://deno.land/std".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Versions with more documentable files than this are not documented in bulk.
    pub max_modules_to_document: usize,
    /// A version uploaded to search within this many days is not uploaded again.
    pub search_dedup_days: i64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_modules_to_document: 1000,
            search_dedup_days: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl DocConfig {
    /// Load config from a TOML file. Falls back to defaults when the file is
    /// missing or unreadable.
    pub fn load(path: &Path) -> Self {
        Self::try_load(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "invalid config, using defaults");
            Self::default()
        })
    }

    /// Like [`DocConfig::load`], but an invalid file is an error. A missing
    /// file still yields defaults.
    pub fn try_load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(_) => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DocConfig =
            toml::from_str(content).map_err(|e| DocError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.store.batch_size == 0 {
            return Err(DocError::Config("store.batch_size must be at least 1".into()));
        }
        if self.store.max_entity_size == 0 {
            return Err(DocError::Config(
                "store.max_entity_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store.timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DocConfig::default();
        assert_eq!(config.store.max_entity_size, DEFAULT_MAX_ENTITY_SIZE);
        assert_eq!(config.jobs.max_modules_to_document, 1000);
        assert_eq!(config.analysis.format, "1");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = DocConfig::from_toml_str(
            r#"
[jobs]
max_modules_to_document = 10

[cache]
max_bytes = 2048
"#,
        )
        .unwrap();
        assert_eq!(config.jobs.max_modules_to_document, 10);
        assert_eq!(config.jobs.search_dedup_days, 5);
        assert_eq!(config.cache.max_bytes, 2048);
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let err = DocConfig::from_toml_str("[store]\nbatch_size = 0\n").unwrap_err();
        assert!(matches!(err, DocError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analysis]\nformat = \"7\"").unwrap();
        let config = DocConfig::load(file.path());
        assert_eq!(config.analysis.format, "7");
    }

    #[test]
    fn test_load_missing_and_invalid_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let missing = DocConfig::load(&dir.path().join("nope.toml"));
        assert_eq!(missing, DocConfig::default());

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "this is = = not toml").unwrap();
        assert_eq!(DocConfig::load(&bad), DocConfig::default());
    }

    #[test]
    fn test_try_load_reports_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[store]\nbatch_size = 0\n").unwrap();
        assert!(matches!(DocConfig::try_load(&bad), Err(DocError::Config(_))));
        assert_eq!(
            DocConfig::try_load(&dir.path().join("nope.toml")).unwrap(),
            DocConfig::default()
        );
    }
}
