//! Error types for docstore.
//!
//! Every fallible operation in the crate returns [`Result`]. Faults are
//! grouped into a small taxonomy ([`FaultKind`]) so the task scheduler can
//! decide how loudly to log a failed job.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Unified error type for the docstore crate.
#[derive(Debug, Error)]
pub enum DocError {
    /// A module, path or symbol is absent after a best-effort load.
    #[error("not found: {0}")]
    NotFound(String),

    /// A malformed specifier, path or unparsable source.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The entity store rejected or failed a commit.
    #[error("store fault: {message}")]
    Store {
        message: String,
        /// Per-mutation diagnostics reported by the store.
        details: Vec<String>,
    },

    /// An internal invariant was violated.
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// A collaborator call did not finish in time.
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        operation: String,
        elapsed: Duration,
    },

    /// A remote fetch failed.
    #[error("fetch failed for {specifier}: {message}")]
    Fetch { specifier: String, message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocError {
    pub fn store(message: impl Into<String>) -> Self {
        DocError::Store {
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Classify this error for logging.
    pub fn fault(&self) -> FaultKind {
        match self {
            DocError::NotFound(_) => FaultKind::NotFound,
            DocError::BadRequest(_) => FaultKind::BadRequest,
            DocError::Store { .. } => FaultKind::Store,
            DocError::Assertion(_) => FaultKind::Assertion,
            DocError::Timeout { .. } | DocError::Fetch { .. } => FaultKind::Collaborator,
            DocError::Serialization(_) | DocError::Config(_) | DocError::Io(_) => {
                FaultKind::Internal
            }
        }
    }
}

/// Fault classes used when reporting a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    NotFound,
    BadRequest,
    Store,
    Assertion,
    /// A remote collaborator was slow or unreachable.
    Collaborator,
    /// The job panicked.
    Panic,
    Internal,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::NotFound => write!(f, "not_found"),
            FaultKind::BadRequest => write!(f, "bad_request"),
            FaultKind::Store => write!(f, "store"),
            FaultKind::Assertion => write!(f, "assertion"),
            FaultKind::Collaborator => write!(f, "collaborator"),
            FaultKind::Panic => write!(f, "panic"),
            FaultKind::Internal => write!(f, "internal"),
        }
    }
}

/// Result alias using [`DocError`].
pub type Result<T> = std::result::Result<T, DocError>;
