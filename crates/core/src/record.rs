//! The persisted task record and its in-memory state transitions.
//!
//! Stores that keep records in memory apply these methods under a per-record
//! lock; the PostgreSQL store encodes the same rules as guarded `UPDATE`s.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::kind::TaskKind;
use crate::progress;
use crate::result::{SuccessPayload, TaskResult};
use crate::status::{Operation, TaskStatus};
use crate::types::{TaskId, Timestamp};

/// Everything the dispatcher supplies when creating a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub id: TaskId,
    pub task_name: TaskKind,
    pub related_table: Option<String>,
    pub related_id: Option<String>,
    pub operation: Option<Operation>,
    pub input_data: serde_json::Value,
}

/// One asynchronous operation's identity, status, and outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub id: TaskId,
    pub status: TaskStatus,
    pub task_name: TaskKind,
    pub related_table: Option<String>,
    pub related_id: Option<String>,
    pub operation: Option<Operation>,
    pub input_data: serde_json::Value,
    pub result: TaskResult,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// What a worker finds when it claims a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    /// The record is now `PROCESSING` and the work should run.
    Acquired(TaskRecord),
    /// The record already reached a terminal state (redelivered item).
    AlreadyTerminal(TaskRecord),
}

impl TaskRecord {
    /// A fresh `PENDING` record with progress 0.
    pub fn new(input: NewTask, now: Timestamp) -> Self {
        Self {
            id: input.id,
            status: TaskStatus::Pending,
            task_name: input.task_name,
            related_table: input.related_table,
            related_id: input.related_id,
            operation: input.operation,
            input_data: input.input_data,
            result: TaskResult::InProgress { progress: 0 },
            created_at: now,
            updated_at: now,
        }
    }

    pub fn progress(&self) -> u8 {
        self.result.progress()
    }

    /// Worker claim. `PENDING` resets progress to 0; a redelivered claim on a
    /// `PROCESSING` record keeps the progress already recorded.
    pub fn claim(&mut self, now: Timestamp) -> Result<(), CoreError> {
        let next = self.status.transition(TaskStatus::Processing)?;
        if self.status == TaskStatus::Pending {
            self.result = TaskResult::InProgress { progress: 0 };
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Record a progress checkpoint. Only legal while `PROCESSING`; the
    /// stored value never decreases. Returns the progress now stored.
    pub fn record_progress(&mut self, reported: u8, now: Timestamp) -> Result<u8, CoreError> {
        match (&self.status, &self.result) {
            (TaskStatus::Processing, TaskResult::InProgress { progress: current }) => {
                let next = progress::advance(*current, reported);
                self.result = TaskResult::InProgress { progress: next };
                self.updated_at = now;
                Ok(next)
            }
            _ => Err(CoreError::InvalidTransition {
                from: self.status,
                to: TaskStatus::Processing,
            }),
        }
    }

    /// Terminal success. Forces progress to 100.
    pub fn succeed(&mut self, payload: SuccessPayload, now: Timestamp) -> Result<(), CoreError> {
        self.status = self.status.transition(TaskStatus::Done)?;
        self.result = TaskResult::Succeeded { payload };
        self.updated_at = now;
        Ok(())
    }

    /// Terminal failure. Keeps whatever progress was last recorded.
    pub fn fail(&mut self, error: impl Into<String>, now: Timestamp) -> Result<(), CoreError> {
        self.status = self.status.transition(TaskStatus::Failed)?;
        self.result = TaskResult::Failed {
            progress: self.progress(),
            error: error.into(),
        };
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Serialize)]
struct RecordWire<'a> {
    id: &'a TaskId,
    status: TaskStatus,
    task_name: TaskKind,
    created_at: Timestamp,
    updated_at: Timestamp,
    input_data: &'a serde_json::Value,
    result: &'a TaskResult,
    progress: u8,
    related_table: &'a Option<String>,
    related_id: &'a Option<String>,
    operation: Option<Operation>,
}

impl Serialize for TaskRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RecordWire {
            id: &self.id,
            status: self.status,
            task_name: self.task_name,
            created_at: self.created_at,
            updated_at: self.updated_at,
            input_data: &self.input_data,
            result: &self.result,
            progress: self.progress(),
            related_table: &self.related_table,
            related_id: &self.related_id,
            operation: self.operation,
        }
        .serialize(serializer)
    }
}

/// Compact list view without `input_data` / `result`.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub id: TaskId,
    pub status: TaskStatus,
    pub task_name: TaskKind,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub progress: u8,
    pub related_table: Option<String>,
    pub related_id: Option<String>,
    pub operation: Option<Operation>,
}

impl From<&TaskRecord> for TaskSummary {
    fn from(record: &TaskRecord) -> Self {
        Self {
            id: record.id.clone(),
            status: record.status,
            task_name: record.task_name,
            created_at: record.created_at,
            updated_at: record.updated_at,
            progress: record.progress(),
            related_table: record.related_table.clone(),
            related_id: record.related_id.clone(),
            operation: record.operation,
        }
    }
}

/// Administrative filter for listing records.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub task_name: Option<TaskKind>,
    pub related_table: Option<String>,
    pub operation: Option<Operation>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Maximum page size for task listing.
pub const MAX_LIMIT: i64 = 100;

/// Default page size for task listing.
pub const DEFAULT_LIMIT: i64 = 50;

impl TaskFilter {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    pub fn matches(&self, record: &TaskRecord) -> bool {
        self.status.map_or(true, |s| s == record.status)
            && self.task_name.map_or(true, |k| k == record.task_name)
            && self
                .related_table
                .as_deref()
                .map_or(true, |t| record.related_table.as_deref() == Some(t))
            && self.operation.map_or(true, |op| record.operation == Some(op))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;

    fn pending() -> TaskRecord {
        TaskRecord::new(
            NewTask {
                id: TaskId::from("t-1"),
                task_name: TaskKind::DeleteEntity,
                related_table: Some("user".into()),
                related_id: Some("u-1".into()),
                operation: Some(Operation::Delete),
                input_data: serde_json::json!({"user_id": "u-1"}),
            },
            Utc::now(),
        )
    }

    #[test]
    fn new_record_is_pending_at_zero() {
        let r = pending();
        assert_eq!(r.status, TaskStatus::Pending);
        assert_eq!(r.progress(), 0);
        assert_eq!(r.created_at, r.updated_at);
    }

    #[test]
    fn claim_moves_to_processing() {
        let mut r = pending();
        r.claim(Utc::now()).unwrap();
        assert_eq!(r.status, TaskStatus::Processing);
        assert_eq!(r.progress(), 0);
    }

    #[test]
    fn reclaim_preserves_progress() {
        let mut r = pending();
        r.claim(Utc::now()).unwrap();
        r.record_progress(67, Utc::now()).unwrap();
        r.claim(Utc::now()).unwrap();
        assert_eq!(r.progress(), 67);
    }

    #[test]
    fn progress_is_monotonic() {
        let mut r = pending();
        r.claim(Utc::now()).unwrap();
        assert_eq!(r.record_progress(50, Utc::now()).unwrap(), 50);
        assert_eq!(r.record_progress(20, Utc::now()).unwrap(), 50);
        assert_eq!(r.progress(), 50);
    }

    #[test]
    fn progress_requires_processing() {
        let mut r = pending();
        assert_matches!(
            r.record_progress(10, Utc::now()),
            Err(CoreError::InvalidTransition { .. })
        );
    }

    #[test]
    fn success_forces_full_progress() {
        let mut r = pending();
        r.claim(Utc::now()).unwrap();
        r.record_progress(33, Utc::now()).unwrap();
        r.succeed(
            SuccessPayload::Delete {
                message: "Successfully deleted user alice".into(),
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(r.status, TaskStatus::Done);
        assert_eq!(r.progress(), 100);
    }

    #[test]
    fn failure_keeps_last_progress() {
        let mut r = pending();
        r.claim(Utc::now()).unwrap();
        r.record_progress(67, Utc::now()).unwrap();
        r.fail("boom", Utc::now()).unwrap();
        assert_eq!(r.status, TaskStatus::Failed);
        assert_eq!(
            r.result,
            TaskResult::Failed {
                progress: 67,
                error: "boom".into()
            }
        );
    }

    #[test]
    fn terminal_records_reject_further_writes() {
        let mut r = pending();
        r.fail("boom", Utc::now()).unwrap();
        assert!(r.claim(Utc::now()).is_err());
        assert!(r
            .succeed(SuccessPayload::Delete { message: "x".into() }, Utc::now())
            .is_err());
        assert!(r.fail("again", Utc::now()).is_err());
        assert_eq!(r.result.error(), Some("boom"));
    }

    #[test]
    fn serialized_record_exposes_derived_progress() {
        let mut r = pending();
        r.claim(Utc::now()).unwrap();
        r.record_progress(33, Utc::now()).unwrap();
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "PROCESSING");
        assert_eq!(json["progress"], 33);
        assert_eq!(json["result"]["progress"], 33);
        assert_eq!(json["task_name"], "delete_entity");
        assert_eq!(json["operation"], "DELETE");
    }

    #[test]
    fn filter_matches_on_all_fields() {
        let r = pending();
        let filter = TaskFilter {
            status: Some(TaskStatus::Pending),
            related_table: Some("user".into()),
            operation: Some(Operation::Delete),
            ..Default::default()
        };
        assert!(filter.matches(&r));

        let other = TaskFilter {
            task_name: Some(TaskKind::GetEntity),
            ..Default::default()
        };
        assert!(!other.matches(&r));
    }

    #[test]
    fn filter_clamps_paging() {
        let filter = TaskFilter {
            limit: Some(1000),
            offset: Some(-5),
            ..Default::default()
        };
        assert_eq!(filter.limit(), MAX_LIMIT);
        assert_eq!(filter.offset(), 0);
        assert_eq!(TaskFilter::default().limit(), DEFAULT_LIMIT);
    }
}
