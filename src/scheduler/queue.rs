//! Unbounded FIFO task queue with a single drain worker.
//!
//! The queue is `Idle` while nothing is queued or running and `Draining`
//! otherwise. Each job runs in its own tokio task so a panic is reported as
//! a failed job instead of stopping the worker.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::Task;
use crate::error::{DocError, FaultKind, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    Draining,
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueState::Idle => write!(f, "idle"),
            QueueState::Draining => write!(f, "draining"),
        }
    }
}

/// Counters observed through [`TaskQueue::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Jobs queued or running.
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Executes tasks popped from the queue.
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    async fn handle(&self, task: Task) -> Result<()>;
}

struct Job {
    id: Uuid,
    task: Task,
    enqueued_at: DateTime<Utc>,
}

/// Producer side. Cheap to clone.
#[derive(Clone)]
pub struct TaskQueue {
    sender: mpsc::UnboundedSender<Job>,
    status: Arc<watch::Sender<QueueStats>>,
}

/// Consumer side, turned into the worker by [`TaskReceiver::spawn`].
pub struct TaskReceiver {
    receiver: mpsc::UnboundedReceiver<Job>,
    status: Arc<watch::Sender<QueueStats>>,
}

impl TaskQueue {
    pub fn channel() -> (TaskQueue, TaskReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(QueueStats::default());
        let status = Arc::new(status);
        (
            TaskQueue {
                sender,
                status: Arc::clone(&status),
            },
            TaskReceiver { receiver, status },
        )
    }

    /// Append a task. Never runs it in the caller's frame.
    pub fn enqueue(&self, task: Task) -> Result<Uuid> {
        let job = Job {
            id: Uuid::new_v4(),
            task,
            enqueued_at: Utc::now(),
        };
        let id = job.id;
        let label = job.task.to_string();

        self.status.send_modify(|s| s.pending += 1);
        if self.sender.send(job).is_err() {
            self.status
                .send_modify(|s| s.pending = s.pending.saturating_sub(1));
            return Err(DocError::Assertion(format!(
                "task queue worker has stopped, dropped {}",
                label
            )));
        }
        debug!(job_id = %id, task = %label, "job enqueued");
        Ok(id)
    }

    pub fn state(&self) -> QueueState {
        if self.status.borrow().pending == 0 {
            QueueState::Idle
        } else {
            QueueState::Draining
        }
    }

    pub fn pending(&self) -> usize {
        self.status.borrow().pending
    }

    pub fn stats(&self) -> QueueStats {
        *self.status.borrow()
    }

    /// Resolve once no jobs are queued or running.
    pub async fn wait_idle(&self) {
        let mut rx = self.status.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|s| s.pending == 0).await;
    }
}

impl TaskReceiver {
    /// Start the drain worker. It runs until every [`TaskQueue`] is dropped.
    pub fn spawn(self, handler: Arc<dyn TaskHandler>) -> JoinHandle<()> {
        let TaskReceiver {
            mut receiver,
            status,
        } = self;
        tokio::spawn(async move {
            info!("task worker started");
            while let Some(job) = receiver.recv().await {
                let ok = run_job(job, Arc::clone(&handler)).await;
                status.send_modify(|s| {
                    s.pending = s.pending.saturating_sub(1);
                    if ok {
                        s.completed += 1;
                    } else {
                        s.failed += 1;
                    }
                });
            }
            info!("task worker stopped");
        })
    }
}

async fn run_job(job: Job, handler: Arc<dyn TaskHandler>) -> bool {
    let Job {
        id,
        task,
        enqueued_at,
    } = job;
    let label = task.to_string();
    let started_at = Utc::now();
    let queued_ms = (started_at - enqueued_at).num_milliseconds();
    let timer = Instant::now();
    info!(job_id = %id, task = %label, queued_ms, "job started");

    let outcome = match tokio::spawn(async move { handler.handle(task).await }).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err((err.fault(), err.to_string())),
        Err(join_err) if join_err.is_panic() => Err((FaultKind::Panic, join_err.to_string())),
        Err(join_err) => Err((FaultKind::Internal, join_err.to_string())),
    };

    let elapsed_ms = timer.elapsed().as_millis() as u64;
    let finished_at = Utc::now();
    match outcome {
        Ok(()) => {
            info!(
                job_id = %id,
                task = %label,
                started_at = %started_at.to_rfc3339(),
                finished_at = %finished_at.to_rfc3339(),
                elapsed_ms,
                "job finished"
            );
            true
        }
        Err((fault, message)) => {
            error!(
                job_id = %id,
                task = %label,
                fault = %fault,
                error = %message,
                started_at = %started_at.to_rfc3339(),
                finished_at = %finished_at.to_rfc3339(),
                elapsed_ms,
                "job failed"
            );
            false
        }
    }
}
