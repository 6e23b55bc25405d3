//! Typed payloads of registry records.

use serde::{Deserialize, Serialize};

use crate::error::{DocError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// One file or directory of a published module version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub size: u64,
}

const DOCUMENTABLE_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

impl ModuleEntry {
    pub fn file(path: &str, size: u64) -> Self {
        Self {
            path: path.to_string(),
            kind: EntryKind::File,
            size,
        }
    }

    pub fn dir(path: &str) -> Self {
        Self {
            path: path.to_string(),
            kind: EntryKind::Dir,
            size: 0,
        }
    }

    /// Script files the documentation engine can read.
    pub fn is_documentable(&self) -> bool {
        if self.kind != EntryKind::File {
            return false;
        }
        let name = self.path.rsplit('/').next().unwrap_or("");
        match name.rsplit_once('.') {
            Some((stem, ext)) => !stem.is_empty() && DOCUMENTABLE_EXTENSIONS.contains(&ext),
            None => false,
        }
    }
}

/// Entry paths are absolute, `/`-separated and free of empty, `.` and `..`
/// segments. The root is `/`.
pub fn validate_path(path: &str) -> Result<()> {
    if path == "/" {
        return Ok(());
    }
    let Some(rest) = path.strip_prefix('/') else {
        return Err(DocError::BadRequest(format!(
            "path \"{}\" must start with /",
            path
        )));
    };
    for segment in rest.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(DocError::BadRequest(format!(
                "path \"{}\" has an invalid segment",
                path
            )));
        }
    }
    Ok(())
}
