//! Background work.
//!
//! Request paths never wait on writes or view regeneration. They describe
//! the work as a [`Task`] and hand it to the [`TaskQueue`]; a single worker
//! drains the queue in FIFO order.

pub mod queue;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use queue::{QueueState, QueueStats, TaskHandler, TaskQueue, TaskReceiver};

use crate::store::Mutation;

/// A unit of deferred work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Task {
    /// Apply mutations with the batched commit.
    Commit { label: String, mutations: Vec<Mutation> },
    RegenerateNavIndex { module: String, version: String, path: String },
    RegenerateSymbolIndex { module: String, version: String },
    UploadToSearch { module: String, version: String, force: bool },
    /// Document every documentable file of a version.
    LoadModule { module: String, version: String },
    AnalyzeDependencies { module: String, version: String, force: bool },
}

impl Task {
    pub fn commit(label: impl Into<String>, mutations: Vec<Mutation>) -> Self {
        Task::Commit {
            label: label.into(),
            mutations,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Task::Commit { .. } => "commit",
            Task::RegenerateNavIndex { .. } => "regenerate_nav_index",
            Task::RegenerateSymbolIndex { .. } => "regenerate_symbol_index",
            Task::UploadToSearch { .. } => "upload_to_search",
            Task::LoadModule { .. } => "load_module",
            Task::AnalyzeDependencies { .. } => "analyze_dependencies",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Commit { label, mutations } => {
                write!(f, "commit({}, {} mutations)", label, mutations.len())
            }
            Task::RegenerateNavIndex {
                module,
                version,
                path,
            } => write!(f, "{}({}@{}{})", self.name(), module, version, path),
            Task::RegenerateSymbolIndex { module, version }
            | Task::LoadModule { module, version } => {
                write!(f, "{}({}@{})", self.name(), module, version)
            }
            Task::UploadToSearch {
                module,
                version,
                force,
            }
            | Task::AnalyzeDependencies {
                module,
                version,
                force,
            } => {
                write!(f, "{}({}@{}", self.name(), module, version)?;
                if *force {
                    write!(f, ", forced")?;
                }
                write!(f, ")")
            }
        }
    }
}
