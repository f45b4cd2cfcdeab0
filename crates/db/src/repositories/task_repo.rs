//! Repository for the `tasks` table.
//!
//! Every mutation is a single guarded `UPDATE ... WHERE id = $1 AND status IN
//! (...)`, so concurrent writers for the same id serialize on the row lock and
//! a stale writer matches zero rows instead of clobbering a newer state.

use asyncops_core::record::{NewTask, TaskFilter};
use asyncops_core::status::TaskStatus;
use sqlx::PgPool;

use crate::models::task::TaskRow;

/// Column list for `tasks` queries.
const COLUMNS: &str = "\
    id, status, task_name, related_table, related_id, operation, \
    input_data, progress, payload, error, created_at, updated_at";

/// Provides data access for task records.
pub struct TaskRepo;

impl TaskRepo {
    /// Insert a new `PENDING` record with progress 0.
    pub async fn create(pool: &PgPool, input: &NewTask) -> Result<TaskRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (id, status, task_name, related_table, related_id, operation, input_data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(input.id.as_str())
            .bind(TaskStatus::Pending.as_str())
            .bind(input.task_name.as_str())
            .bind(&input.related_table)
            .bind(&input.related_id)
            .bind(input.operation.map(|op| op.as_str()))
            .bind(&input.input_data)
            .fetch_one(pool)
            .await
    }

    /// Find a task by its ID.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<TaskRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Move a record to `PROCESSING`.
    ///
    /// From `PENDING` progress resets to 0; a redelivered claim on a
    /// `PROCESSING` row keeps its progress. Returns `None` when the row is
    /// missing or already terminal.
    pub async fn claim(pool: &PgPool, id: &str) -> Result<Option<TaskRow>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks \
             SET status = $2, \
                 progress = CASE WHEN status = $3 THEN 0 ELSE progress END, \
                 updated_at = NOW() \
             WHERE id = $1 AND status IN ($2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(id)
            .bind(TaskStatus::Processing.as_str())
            .bind(TaskStatus::Pending.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Raise the progress of a `PROCESSING` record. Only the progress column
    /// changes and it never decreases. Returns the stored value, or `None`
    /// when the row is not `PROCESSING`.
    pub async fn update_progress(
        pool: &PgPool,
        id: &str,
        percent: i16,
    ) -> Result<Option<i16>, sqlx::Error> {
        sqlx::query_scalar::<_, i16>(
            "UPDATE tasks \
             SET progress = GREATEST(progress, $2), updated_at = NOW() \
             WHERE id = $1 AND status = $3 \
             RETURNING progress",
        )
        .bind(id)
        .bind(percent)
        .bind(TaskStatus::Processing.as_str())
        .fetch_optional(pool)
        .await
    }

    /// Mark a non-terminal task as `DONE` with its payload, forcing progress
    /// to 100.
    pub async fn complete(
        pool: &PgPool,
        id: &str,
        payload: &serde_json::Value,
    ) -> Result<Option<TaskRow>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks \
             SET status = $2, payload = $3, error = NULL, progress = 100, updated_at = NOW() \
             WHERE id = $1 AND status IN ($4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(id)
            .bind(TaskStatus::Done.as_str())
            .bind(payload)
            .bind(TaskStatus::Pending.as_str())
            .bind(TaskStatus::Processing.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Mark a non-terminal task as `FAILED`. Progress is left untouched.
    pub async fn fail(pool: &PgPool, id: &str, error: &str) -> Result<Option<TaskRow>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks \
             SET status = $2, error = $3, updated_at = NOW() \
             WHERE id = $1 AND status IN ($4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(id)
            .bind(TaskStatus::Failed.as_str())
            .bind(error)
            .bind(TaskStatus::Pending.as_str())
            .bind(TaskStatus::Processing.as_str())
            .fetch_optional(pool)
            .await
    }

    /// List tasks newest first, filtered by any combination of status, task
    /// name, related table and operation.
    pub async fn list(pool: &PgPool, filter: &TaskFilter) -> Result<Vec<TaskRow>, sqlx::Error> {
        // Build the WHERE clause and track the next bind parameter index.
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        if filter.status.is_some() {
            conditions.push(format!("status = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.task_name.is_some() {
            conditions.push(format!("task_name = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.related_table.is_some() {
            conditions.push(format!("related_table = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.operation.is_some() {
            conditions.push(format!("operation = ${bind_idx}"));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM tasks \
             {where_clause} \
             ORDER BY created_at DESC, id \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, TaskRow>(&query);

        if let Some(status) = filter.status {
            q = q.bind(status.as_str());
        }
        if let Some(kind) = filter.task_name {
            q = q.bind(kind.as_str());
        }
        if let Some(table) = &filter.related_table {
            q = q.bind(table);
        }
        if let Some(op) = filter.operation {
            q = q.bind(op.as_str());
        }

        q = q.bind(filter.limit()).bind(filter.offset());

        q.fetch_all(pool).await
    }
}
