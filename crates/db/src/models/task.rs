//! Row model for the `tasks` table.

use asyncops_core::error::CoreError;
use asyncops_core::kind::TaskKind;
use asyncops_core::record::TaskRecord;
use asyncops_core::result::TaskResult;
use asyncops_core::status::{Operation, TaskStatus};
use asyncops_core::types::{TaskId, Timestamp};
use sqlx::FromRow;

/// A row from the `tasks` table.
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: String,
    pub status: String,
    pub task_name: String,
    pub related_table: Option<String>,
    pub related_id: Option<String>,
    pub operation: Option<String>,
    pub input_data: serde_json::Value,
    pub progress: i16,
    pub payload: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TaskRow {
    pub fn parsed_status(&self) -> Result<TaskStatus, CoreError> {
        self.status.parse()
    }
}

impl TryFrom<TaskRow> for TaskRecord {
    type Error = CoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let status: TaskStatus = row.status.parse()?;
        let task_name: TaskKind = row.task_name.parse()?;
        let operation = row
            .operation
            .as_deref()
            .map(str::parse::<Operation>)
            .transpose()?;
        let progress = u8::try_from(row.progress.clamp(0, 100)).unwrap_or(0);
        let result =
            TaskResult::from_parts(status, task_name, progress, row.payload.as_ref(), row.error)?;

        Ok(TaskRecord {
            id: TaskId::from(row.id),
            status,
            task_name,
            related_table: row.related_table,
            related_id: row.related_id,
            operation,
            input_data: row.input_data,
            result,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn row(status: &str) -> TaskRow {
        TaskRow {
            id: "t-1".into(),
            status: status.into(),
            task_name: "delete_entity".into(),
            related_table: Some("user".into()),
            related_id: Some("u-1".into()),
            operation: Some("DELETE".into()),
            input_data: json!({"user_id": "u-1"}),
            progress: 33,
            payload: None,
            error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn processing_row_converts_to_in_progress() {
        let record = TaskRecord::try_from(row("PROCESSING")).unwrap();
        assert_eq!(record.status, TaskStatus::Processing);
        assert_eq!(record.result, TaskResult::InProgress { progress: 33 });
        assert_eq!(record.operation, Some(Operation::Delete));
    }

    #[test]
    fn done_row_decodes_payload() {
        let mut r = row("DONE");
        r.progress = 100;
        r.payload = Some(json!({"message": "Successfully deleted user alice"}));
        let record = TaskRecord::try_from(r).unwrap();
        assert_eq!(record.progress(), 100);
        assert_eq!(record.result.to_json()["message"], "Successfully deleted user alice");
    }

    #[test]
    fn unknown_status_label_is_rejected() {
        assert!(TaskRecord::try_from(row("FAILURE")).is_err());
    }
}
