//! Dispatch coordinator.
//!
//! The task id is generated here and threaded through both writes, so the
//! record and the queued item always share it. The record is written first:
//! a worker can never claim an item whose record does not exist yet.

use std::sync::Arc;

use asyncops_core::kind::TaskKind;
use asyncops_core::record::NewTask;
use asyncops_core::status::Operation;
use asyncops_core::types::TaskId;
use asyncops_db::store::TaskStore;
use asyncops_queue::{QueueBackend, WorkItem};

use crate::error::AppResult;

/// Caller-facing poll path for a task.
pub fn status_path(id: &TaskId) -> String {
    format!("/api/v1/tasks/{id}/status")
}

/// One operation request.
#[derive(Debug, Clone)]
pub struct Submission {
    pub task_name: TaskKind,
    pub related_table: Option<String>,
    pub related_id: Option<String>,
    pub operation: Option<Operation>,
    pub input_data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submitted {
    pub task_id: TaskId,
    pub status_path: String,
}

pub struct TaskDispatcher {
    tasks: Arc<dyn TaskStore>,
    queue: Arc<dyn QueueBackend>,
}

impl TaskDispatcher {
    pub fn new(tasks: Arc<dyn TaskStore>, queue: Arc<dyn QueueBackend>) -> Self {
        Self { tasks, queue }
    }

    /// Create the `PENDING` record, then enqueue the work item under the same
    /// id. Returns as soon as both writes land.
    ///
    /// If the enqueue fails the record is marked `FAILED` (best effort) so it
    /// does not sit `PENDING` forever, and the queue error is returned.
    pub async fn submit(&self, submission: Submission) -> AppResult<Submitted> {
        let task_id = TaskId::generate();
        let task_name = submission.task_name;

        self.tasks
            .create(NewTask {
                id: task_id.clone(),
                task_name,
                related_table: submission.related_table,
                related_id: submission.related_id,
                operation: submission.operation,
                input_data: submission.input_data.clone(),
            })
            .await?;

        let item = WorkItem {
            id: task_id.clone(),
            task_name,
            payload: submission.input_data,
        };
        if let Err(e) = self.queue.enqueue(&item).await {
            tracing::error!(task_id = %task_id, error = %e, "Failed to enqueue work item");
            if let Err(write_err) = self
                .tasks
                .fail(&task_id, &format!("Failed to enqueue task: {e}"))
                .await
            {
                tracing::error!(
                    task_id = %task_id,
                    error = %write_err,
                    "Failed to mark unqueued task as failed",
                );
            }
            return Err(e.into());
        }

        tracing::info!(task_id = %task_id, task_name = %task_name, "Task submitted");
        Ok(Submitted {
            status_path: status_path(&task_id),
            task_id,
        })
    }
}
