//! The execution lifecycle every work item follows.
//!
//! 1. Claim the record (`PROCESSING`).
//! 2. Run the handler, persisting progress after each step.
//! 3. Write exactly one terminal outcome, then settle the queue item.
//!
//! Failures inside the handler never escape [`TaskExecutor::execute`], panics
//! included: they become a single best-effort `FAILED` write. If that write
//! fails too the record stays `PROCESSING` and the status reconciler repairs
//! it from the queue's view later.
//!
//! A duplicate delivery can lose the race to another worker that already
//! wrote the terminal outcome. Its rejected writes are not failures: the
//! executor reloads the record and settles the item with the stored outcome.

use std::sync::Arc;

use asyncops_core::progress;
use asyncops_core::record::{Claim, TaskRecord};
use asyncops_core::result::{SuccessPayload, TaskResult};
use asyncops_core::status::TaskStatus;
use asyncops_core::types::TaskId;
use asyncops_db::store::{TaskStore, UserStore};
use asyncops_db::StoreError;
use asyncops_queue::{Delivery, QueueBackend};

use crate::error::TaskFailure;
use crate::operations;
use crate::pacing::StepPacing;

/// How one delivery ended, for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Handler succeeded. `persisted` is false when the `DONE` write failed.
    Completed { persisted: bool },
    /// Handler failed. `persisted` is false when the `FAILED` write failed.
    Failed { error: String, persisted: bool },
    /// Redelivery of a record that was already terminal; nothing ran.
    Skipped { status: TaskStatus },
    /// No record exists for the work item.
    Orphaned,
}

/// Progress checkpoints for one running task.
pub struct Steps {
    id: TaskId,
    tasks: Arc<dyn TaskStore>,
    queue: Arc<dyn QueueBackend>,
    pacing: StepPacing,
    total: u32,
    completed: u32,
}

impl Steps {
    /// Finish one step: pace, then persist the new progress to the record and
    /// report it to the queue. Only the record write can fail the task.
    pub async fn advance(&mut self) -> Result<u8, TaskFailure> {
        self.pacing.pause().await;
        self.completed += 1;
        let reported = progress::step_progress(self.completed, self.total);
        let stored = self.tasks.set_progress(&self.id, reported).await?;
        tracing::debug!(task_id = %self.id, step = self.completed, total = self.total, progress = stored, "Step complete");

        if let Err(e) = self.queue.report_progress(&self.id, stored).await {
            tracing::warn!(task_id = %self.id, error = %e, "Advisory progress report failed");
        }
        Ok(stored)
    }
}

/// Runs delivered work items against the stores.
pub struct TaskExecutor {
    tasks: Arc<dyn TaskStore>,
    users: Arc<dyn UserStore>,
    queue: Arc<dyn QueueBackend>,
    pacing: StepPacing,
}

impl TaskExecutor {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        users: Arc<dyn UserStore>,
        queue: Arc<dyn QueueBackend>,
        pacing: StepPacing,
    ) -> Self {
        Self {
            tasks,
            users,
            queue,
            pacing,
        }
    }

    /// Execute one delivery end to end. Never returns an error.
    pub async fn execute(&self, delivery: &Delivery) -> Outcome {
        let id = &delivery.item.id;
        tracing::info!(
            task_id = %id,
            task_name = %delivery.item.task_name,
            attempt = delivery.attempt,
            "Executing task",
        );

        let record = match self.tasks.claim(id).await {
            Ok(Claim::Acquired(record)) => record,
            Ok(Claim::AlreadyTerminal(record)) => return self.settle_terminal(&record).await,
            Err(e) if e.is_not_found() => {
                tracing::error!(
                    task_id = %id,
                    "No task record for work item; records must be created before enqueue",
                );
                self.nack(id, &format!("Task record {id} does not exist")).await;
                return Outcome::Orphaned;
            }
            Err(e) => return self.fail(id, TaskFailure::from(e)).await,
        };

        if delivery.is_redelivery() {
            tracing::warn!(
                task_id = %id,
                attempt = delivery.attempt,
                progress = record.progress(),
                "Re-running redelivered task",
            );
        }

        let mut steps = Steps {
            id: id.clone(),
            tasks: Arc::clone(&self.tasks),
            queue: Arc::clone(&self.queue),
            pacing: self.pacing,
            total: record.task_name.total_steps(),
            completed: 0,
        };
        let users = Arc::clone(&self.users);
        let handler =
            tokio::spawn(async move { operations::run(&record, users.as_ref(), &mut steps).await });

        match handler.await {
            Ok(Ok(payload)) => self.complete(id, payload).await,
            Ok(Err(TaskFailure::Persistence(e))) if e.terminal_conflict().is_some() => {
                self.settle_superseded(id, &e).await
            }
            Ok(Err(failure)) => self.fail(id, failure).await,
            Err(join) => {
                tracing::error!(task_id = %id, error = %join, "Task handler aborted");
                self.fail(id, TaskFailure::Aborted(join.to_string())).await
            }
        }
    }

    async fn complete(&self, id: &TaskId, payload: SuccessPayload) -> Outcome {
        let persisted = match self.tasks.complete(id, &payload).await {
            Ok(_) => {
                tracing::info!(task_id = %id, "Task completed");
                true
            }
            Err(e) if e.terminal_conflict().is_some() => return self.settle_superseded(id, &e).await,
            Err(e) => {
                tracing::error!(
                    task_id = %id,
                    error = %e,
                    "Failed to persist task completion; awaiting reconciliation",
                );
                false
            }
        };

        // The queue still learns the result so a status query can repair the
        // record if the write above was lost.
        let result = TaskResult::Succeeded { payload }.to_json();
        if let Err(e) = self.queue.ack(id, &result).await {
            tracing::error!(task_id = %id, error = %e, "Failed to ack work item");
        }
        Outcome::Completed { persisted }
    }

    /// The single failure path: one best-effort `FAILED` write, then nack.
    async fn fail(&self, id: &TaskId, failure: TaskFailure) -> Outcome {
        let error = failure.to_string();
        tracing::warn!(task_id = %id, error = %error, "Task failed");

        let persisted = match self.tasks.fail(id, &error).await {
            Ok(_) => true,
            Err(e) if e.terminal_conflict().is_some() => return self.settle_superseded(id, &e).await,
            Err(e) => {
                tracing::error!(
                    task_id = %id,
                    error = %e,
                    "Failed to persist task failure; record left PROCESSING",
                );
                false
            }
        };

        self.nack(id, &error).await;
        Outcome::Failed { error, persisted }
    }

    /// Settle a redelivered item whose record is already terminal, using the
    /// stored outcome. The record is not touched.
    async fn settle_terminal(&self, record: &TaskRecord) -> Outcome {
        tracing::info!(
            task_id = %record.id,
            status = %record.status,
            "Task already terminal; skipping redelivered work item",
        );
        match record.result.error() {
            Some(error) => self.nack(&record.id, error).await,
            None => {
                if let Err(e) = self.queue.ack(&record.id, &record.result.to_json()).await {
                    tracing::error!(task_id = %record.id, error = %e, "Failed to ack work item");
                }
            }
        }
        Outcome::Skipped {
            status: record.status,
        }
    }

    /// Another delivery finished the record first. Settle from what it stored.
    async fn settle_superseded(&self, id: &TaskId, rejected: &StoreError) -> Outcome {
        tracing::info!(task_id = %id, error = %rejected, "Task finished by another delivery");
        match self.tasks.get(id).await {
            Ok(Some(record)) if record.status.is_terminal() => self.settle_terminal(&record).await,
            other => {
                if let Err(e) = other {
                    tracing::error!(task_id = %id, error = %e, "Failed to reload finished task");
                }
                // The record is terminal even if it cannot be read back; leave
                // the queue item to whichever delivery finished it.
                Outcome::Skipped {
                    status: rejected.terminal_conflict().unwrap_or(TaskStatus::Done),
                }
            }
        }
    }

    async fn nack(&self, id: &TaskId, error: &str) {
        if let Err(e) = self.queue.nack(id, error).await {
            tracing::error!(task_id = %id, error = %e, "Failed to nack work item");
        }
    }
}
