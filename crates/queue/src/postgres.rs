//! Queue adapter on the `task_queue` table.
//!
//! Claims use `SELECT ... FOR UPDATE SKIP LOCKED` so concurrent workers never
//! take the same item.

use std::time::Duration;

use async_trait::async_trait;
use asyncops_core::backend_status::BackendStatus;
use asyncops_core::kind::TaskKind;
use asyncops_core::types::TaskId;
use sqlx::PgPool;

use crate::{Delivery, QueueBackend, QueueError, WorkItem};

const STATE_QUEUED: &str = "queued";
const STATE_STARTED: &str = "started";
const STATE_SUCCEEDED: &str = "succeeded";
const STATE_FAILED: &str = "failed";

#[derive(Debug, sqlx::FromRow)]
struct ClaimedRow {
    id: String,
    task_name: String,
    payload: serde_json::Value,
    attempts: i32,
}

impl TryFrom<ClaimedRow> for Delivery {
    type Error = QueueError;

    fn try_from(row: ClaimedRow) -> Result<Self, Self::Error> {
        let task_name: TaskKind = row.task_name.parse().map_err(|e| QueueError::Malformed {
            id: row.id.clone(),
            reason: format!("{e}"),
        })?;
        Ok(Delivery {
            item: WorkItem {
                id: TaskId::from(row.id),
                task_name,
                payload: row.payload,
            },
            attempt: row.attempts,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StateRow {
    state: String,
    result: Option<serde_json::Value>,
    error: Option<String>,
}

impl From<StateRow> for BackendStatus {
    fn from(row: StateRow) -> Self {
        match row.state.as_str() {
            STATE_QUEUED => BackendStatus::Queued,
            STATE_STARTED => BackendStatus::Started,
            STATE_SUCCEEDED => BackendStatus::Succeeded {
                result: row.result.unwrap_or_else(|| serde_json::json!({})),
            },
            STATE_FAILED => BackendStatus::Failed {
                error: row.error.unwrap_or_default(),
            },
            _ => BackendStatus::Unknown,
        }
    }
}

#[derive(Clone)]
pub struct PgQueue {
    pool: PgPool,
}

impl PgQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueBackend for PgQueue {
    async fn enqueue(&self, item: &WorkItem) -> Result<(), QueueError> {
        sqlx::query(
            "INSERT INTO task_queue (id, task_name, payload, state) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(item.id.as_str())
        .bind(item.task_name.as_str())
        .bind(&item.payload)
        .bind(STATE_QUEUED)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn status(&self, id: &TaskId) -> Result<BackendStatus, QueueError> {
        let row = sqlx::query_as::<_, StateRow>(
            "SELECT state, result, error FROM task_queue WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map_or(BackendStatus::Unknown, BackendStatus::from))
    }

    async fn claim_next(&self, worker: &str) -> Result<Option<Delivery>, QueueError> {
        let row = sqlx::query_as::<_, ClaimedRow>(
            "UPDATE task_queue \
             SET state = $2, claimed_by = $1, claimed_at = NOW(), attempts = attempts + 1 \
             WHERE id = ( \
                 SELECT id FROM task_queue \
                 WHERE state = $3 \
                 ORDER BY enqueued_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING id, task_name, payload, attempts",
        )
        .bind(worker)
        .bind(STATE_STARTED)
        .bind(STATE_QUEUED)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Delivery::try_from).transpose()
    }

    async fn report_progress(&self, id: &TaskId, progress: u8) -> Result<(), QueueError> {
        sqlx::query(
            "UPDATE task_queue SET progress = GREATEST(progress, $2) \
             WHERE id = $1 AND state = $3",
        )
        .bind(id.as_str())
        .bind(i16::from(progress))
        .bind(STATE_STARTED)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ack(&self, id: &TaskId, result: &serde_json::Value) -> Result<(), QueueError> {
        sqlx::query(
            "UPDATE task_queue \
             SET state = $2, result = $3, progress = 100, finished_at = NOW() \
             WHERE id = $1 AND state = $4",
        )
        .bind(id.as_str())
        .bind(STATE_SUCCEEDED)
        .bind(result)
        .bind(STATE_STARTED)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn nack(&self, id: &TaskId, error: &str) -> Result<(), QueueError> {
        sqlx::query(
            "UPDATE task_queue \
             SET state = $2, error = $3, finished_at = NOW() \
             WHERE id = $1 AND state = $4",
        )
        .bind(id.as_str())
        .bind(STATE_FAILED)
        .bind(error)
        .bind(STATE_STARTED)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn requeue_stale(&self, visibility_timeout: Duration) -> Result<u64, QueueError> {
        let result = sqlx::query(
            "UPDATE task_queue \
             SET state = $1, claimed_by = NULL, claimed_at = NULL \
             WHERE state = $2 AND claimed_at < NOW() - make_interval(secs => $3)",
        )
        .bind(STATE_QUEUED)
        .bind(STATE_STARTED)
        .bind(visibility_timeout.as_secs_f64())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
