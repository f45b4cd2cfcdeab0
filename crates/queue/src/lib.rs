//! Task-queue backend seam.
//!
//! The queue only transports work items and reports what it knows about each
//! one; the task record in the store stays the source of truth. Two
//! implementations ship here: [`PgQueue`] on the `task_queue` table and
//! [`MemoryQueue`] for single-process runs and tests.

use std::time::Duration;

use async_trait::async_trait;
use asyncops_core::backend_status::BackendStatus;
use asyncops_core::types::TaskId;

pub mod error;
pub mod item;
pub mod memory;
pub mod postgres;

pub use error::QueueError;
pub use item::{Delivery, WorkItem};
pub use memory::MemoryQueue;
pub use postgres::PgQueue;

/// At-least-once work queue with per-item status.
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Make `item` available to workers. Its id is the task id.
    async fn enqueue(&self, item: &WorkItem) -> Result<(), QueueError>;

    /// What the backend currently knows about a task.
    async fn status(&self, id: &TaskId) -> Result<BackendStatus, QueueError>;

    /// Take the oldest queued item, marking it started. `None` when idle.
    async fn claim_next(&self, worker: &str) -> Result<Option<Delivery>, QueueError>;

    /// Advisory progress for the backend's own view. Callers log and ignore
    /// errors from this.
    async fn report_progress(&self, id: &TaskId, progress: u8) -> Result<(), QueueError>;

    /// The item succeeded with `result`. Ack and nack only settle a started
    /// item; on a queued or already settled one they are no-ops.
    async fn ack(&self, id: &TaskId, result: &serde_json::Value) -> Result<(), QueueError>;

    /// The item failed with `error`. Failed items are not retried.
    async fn nack(&self, id: &TaskId, error: &str) -> Result<(), QueueError>;

    /// Put items started longer than `visibility_timeout` ago back in the
    /// queue. Returns how many were requeued.
    async fn requeue_stale(&self, visibility_timeout: Duration) -> Result<u64, QueueError>;
}
