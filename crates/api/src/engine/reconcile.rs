//! Status reconciler.
//!
//! A status query cross-checks the stored record against the queue's view
//! and persists any forward-only repair before answering. The decision
//! itself is [`asyncops_core::reconcile::plan`]; this module applies it.

use std::sync::Arc;

use asyncops_core::error::CoreError;
use asyncops_core::reconcile::{plan, Decision, Repair};
use asyncops_core::record::{Claim, TaskRecord};
use asyncops_core::types::TaskId;
use asyncops_db::store::TaskStore;
use asyncops_db::StoreError;
use asyncops_queue::QueueBackend;

use crate::error::AppResult;

const ENTITY_TASK: &str = "Task";

pub struct TaskReconciler {
    tasks: Arc<dyn TaskStore>,
    queue: Arc<dyn QueueBackend>,
}

impl TaskReconciler {
    pub fn new(tasks: Arc<dyn TaskStore>, queue: Arc<dyn QueueBackend>) -> Self {
        Self { tasks, queue }
    }

    /// Load the record, repair drift against the queue, and return it.
    ///
    /// A missing record is `NotFound`. If the queue cannot be asked, or its
    /// answer cannot be applied, the stored record is returned unchanged.
    pub async fn get_status(&self, id: &TaskId) -> AppResult<TaskRecord> {
        let record = self.load(id).await?;
        if record.status.is_terminal() {
            return Ok(record);
        }

        let backend = match self.queue.status(id).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(task_id = %id, error = %e, "Queue status unavailable; serving stored record");
                return Ok(record);
            }
        };

        let repair = match plan(&record, &backend) {
            Ok(Decision::InSync) => return Ok(record),
            Ok(Decision::Ignored { backend: mapped }) => {
                tracing::warn!(
                    task_id = %id,
                    stored = %record.status,
                    backend = %mapped,
                    "Ignoring backend status that would move the task backwards",
                );
                return Ok(record);
            }
            Ok(Decision::Repair(repair)) => repair,
            Err(e) => {
                tracing::error!(task_id = %id, error = %e, "Cannot decode backend result");
                return Ok(record);
            }
        };

        tracing::info!(
            task_id = %id,
            from = %record.status,
            to = %repair.target(),
            backend = %backend,
            "Reconciling task status",
        );
        self.apply(id, repair).await
    }

    async fn load(&self, id: &TaskId) -> AppResult<TaskRecord> {
        self.tasks.get(id).await?.ok_or_else(|| {
            CoreError::NotFound {
                entity: ENTITY_TASK,
                id: id.to_string(),
            }
            .into()
        })
    }

    async fn apply(&self, id: &TaskId, repair: Repair) -> AppResult<TaskRecord> {
        let written = match repair {
            Repair::MarkProcessing => self.tasks.claim(id).await.map(|claim| match claim {
                Claim::Acquired(r) | Claim::AlreadyTerminal(r) => r,
            }),
            Repair::Complete(payload) => self.tasks.complete(id, &payload).await,
            Repair::Fail(error) => self.tasks.fail(id, &error).await,
        };

        match written {
            Ok(record) => Ok(record),
            // A worker write landed between our read and this repair.
            Err(StoreError::Core(CoreError::InvalidTransition { .. })) => self.load(id).await,
            Err(e) => Err(e.into()),
        }
    }
}
