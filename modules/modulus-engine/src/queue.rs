//! Deferred-execution task queue.
//!
//! The message deliberately carries ids only — the payload is re-read from
//! the store on the worker side, keeping queue messages small and avoiding a
//! second serialization of the payload.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::executor::TaskExecutor;
use crate::traits::RecordStore;

/// Queue message for one deferred mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationTask {
    pub record_id: Uuid,
    pub module: String,
    pub handler: String,
}

/// Abstract enqueue capability injected into the coordinator. `Ok` is the
/// broker's ack. Retry and backoff policy belong to the broker, not here.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, task: MutationTask) -> Result<()>;
}

// ---------------------------------------------------------------------------
// MemoryTaskQueue — in-process channel-backed queue
// ---------------------------------------------------------------------------

/// Tokio mpsc-backed queue for single-process deployments and tests.
/// Durable brokers are external adapters satisfying the same trait.
pub struct MemoryTaskQueue {
    tx: mpsc::UnboundedSender<MutationTask>,
}

impl MemoryTaskQueue {
    /// Create the queue and the receiver half a `TaskWorker` consumes.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MutationTask>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl TaskQueue for MemoryTaskQueue {
    async fn enqueue(&self, task: MutationTask) -> Result<()> {
        self.tx
            .send(task)
            .map_err(|_| anyhow!("task queue receiver dropped"))
    }
}

// ---------------------------------------------------------------------------
// TaskWorker — the consuming loop
// ---------------------------------------------------------------------------

/// Drains the queue, running each task through the executor. Executor faults
/// are already reflected on the record before they surface here, so the
/// worker only logs them; an external retry policy may re-deliver.
pub struct TaskWorker<S: RecordStore> {
    executor: TaskExecutor<S>,
    rx: mpsc::UnboundedReceiver<MutationTask>,
}

impl<S: RecordStore> TaskWorker<S> {
    pub fn new(executor: TaskExecutor<S>, rx: mpsc::UnboundedReceiver<MutationTask>) -> Self {
        Self { executor, rx }
    }

    /// Consume tasks until every queue sender is dropped.
    pub async fn run(mut self) {
        while let Some(task) = self.rx.recv().await {
            if let Err(error) = self.executor.run(&task).await {
                warn!(
                    record_id = %task.record_id,
                    error = format!("{error:#}"),
                    "deferred mutation failed"
                );
            }
        }
    }
}
