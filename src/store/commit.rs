//! Batched, non-transactional commits.

use std::time::Instant;
use tracing::{debug, info};

use super::entity::Mutation;
use super::EntityStore;
use crate::error::{DocError, Result};

/// Summary of a finished commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub applied: usize,
    pub calls: usize,
}

/// Write `mutations` in batches of at most `batch_size`.
///
/// The store may apply only part of a batch; the unapplied tail is sent
/// again and the remaining count is carried across calls. A batch that
/// reports failures, or applies nothing, aborts the commit.
pub async fn commit(
    store: &dyn EntityStore,
    mutations: &[Mutation],
    batch_size: usize,
) -> Result<CommitSummary> {
    let start = Instant::now();
    let total = mutations.len();
    let batch_size = batch_size.max(1);
    let mut summary = CommitSummary::default();
    let mut remaining = total;
    let mut offset = 0;

    while offset < total {
        let end = (offset + batch_size).min(total);
        let result = store.commit_batch(&mutations[offset..end]).await?;
        summary.calls += 1;

        if !result.failures.is_empty() {
            return Err(DocError::Store {
                message: format!(
                    "commit rejected {} mutation(s), {} of {} applied",
                    result.failures.len(),
                    summary.applied + result.applied,
                    total
                ),
                details: result.failures,
            });
        }
        if result.applied == 0 {
            return Err(DocError::Store {
                message: format!("commit made no progress with {} remaining", remaining),
                details: vec![format!("first pending key: {}", mutations[offset].key())],
            });
        }

        let applied = result.applied.min(end - offset);
        offset += applied;
        remaining -= applied;
        summary.applied += applied;
        debug!(applied, remaining, "committed batch");
    }

    if total > 0 {
        info!(
            mutations = total,
            calls = summary.calls,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "commit complete"
        );
    }
    Ok(summary)
}
