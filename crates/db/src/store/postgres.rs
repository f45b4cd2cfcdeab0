//! PostgreSQL-backed stores delegating to the repositories.

use async_trait::async_trait;
use asyncops_core::record::{Claim, NewTask, TaskFilter, TaskRecord};
use asyncops_core::result::SuccessPayload;
use asyncops_core::status::TaskStatus;
use asyncops_core::types::TaskId;
use asyncops_core::user::{CreateUser, UpdateUser, User, ENTITY_USER};
use sqlx::PgPool;

use super::{TaskStore, UserStore};
use crate::error::{classify_unique_violation, StoreError};
use crate::models::task::TaskRow;
use crate::repositories::{TaskRepo, UserRepo};

const ENTITY_TASK: &str = "Task";

#[derive(Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn to_record(row: TaskRow) -> Result<TaskRecord, StoreError> {
        Ok(TaskRecord::try_from(row)?)
    }

    /// Explain why a guarded update matched no row.
    async fn rejected(&self, id: &TaskId, to: TaskStatus) -> StoreError {
        match TaskRepo::find_by_id(&self.pool, id.as_str()).await {
            Ok(Some(row)) => match row.parsed_status() {
                Ok(from) => StoreError::invalid_transition(from, to),
                Err(e) => e.into(),
            },
            Ok(None) => StoreError::not_found(ENTITY_TASK, id.as_str()),
            Err(e) => e.into(),
        }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn create(&self, input: NewTask) -> Result<TaskRecord, StoreError> {
        let row = TaskRepo::create(&self.pool, &input).await.map_err(|e| {
            classify_unique_violation(e, |_| format!("Task {} already exists", input.id))
        })?;
        Self::to_record(row)
    }

    async fn get(&self, id: &TaskId) -> Result<Option<TaskRecord>, StoreError> {
        TaskRepo::find_by_id(&self.pool, id.as_str())
            .await?
            .map(Self::to_record)
            .transpose()
    }

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<TaskRecord>, StoreError> {
        TaskRepo::list(&self.pool, filter)
            .await?
            .into_iter()
            .map(Self::to_record)
            .collect()
    }

    async fn claim(&self, id: &TaskId) -> Result<Claim, StoreError> {
        if let Some(row) = TaskRepo::claim(&self.pool, id.as_str()).await? {
            return Ok(Claim::Acquired(Self::to_record(row)?));
        }
        match TaskRepo::find_by_id(&self.pool, id.as_str()).await? {
            Some(row) => Ok(Claim::AlreadyTerminal(Self::to_record(row)?)),
            None => Err(StoreError::not_found(ENTITY_TASK, id.as_str())),
        }
    }

    async fn set_progress(&self, id: &TaskId, progress: u8) -> Result<u8, StoreError> {
        match TaskRepo::update_progress(&self.pool, id.as_str(), i16::from(progress)).await? {
            Some(stored) => Ok(u8::try_from(stored).unwrap_or(progress)),
            None => Err(self.rejected(id, TaskStatus::Processing).await),
        }
    }

    async fn complete(
        &self,
        id: &TaskId,
        payload: &SuccessPayload,
    ) -> Result<TaskRecord, StoreError> {
        let payload = serde_json::Value::Object(payload.to_json());
        match TaskRepo::complete(&self.pool, id.as_str(), &payload).await? {
            Some(row) => Self::to_record(row),
            None => Err(self.rejected(id, TaskStatus::Done).await),
        }
    }

    async fn fail(&self, id: &TaskId, error: &str) -> Result<TaskRecord, StoreError> {
        match TaskRepo::fail(&self.pool, id.as_str(), error).await? {
            Some(row) => Self::to_record(row),
            None => Err(self.rejected(id, TaskStatus::Failed).await),
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Human-readable message for a `uq_users_*` violation.
fn describe_user_conflict(constraint: &str, username: Option<&str>, email: Option<&str>) -> String {
    match constraint {
        "uq_users_username" => format!(
            "{ENTITY_USER} with username {} already exists",
            username.unwrap_or_default()
        ),
        "uq_users_email" => format!(
            "{ENTITY_USER} with email {} already exists",
            email.unwrap_or_default()
        ),
        other => format!("Duplicate value violates unique constraint: {other}"),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, input: &CreateUser) -> Result<User, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let row = UserRepo::create(&self.pool, &id, input).await.map_err(|e| {
            classify_unique_violation(e, |c| {
                describe_user_conflict(c, Some(&input.username), Some(&input.email))
            })
        })?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_id(&self.pool, id).await?.map(User::from))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_username(&self.pool, username)
            .await?
            .map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_email(&self.pool, email).await?.map(User::from))
    }

    async fn update(&self, id: &str, input: &UpdateUser) -> Result<Option<User>, StoreError> {
        let row = UserRepo::update(&self.pool, id, input).await.map_err(|e| {
            classify_unique_violation(e, |c| {
                describe_user_conflict(c, input.username.as_deref(), input.email.as_deref())
            })
        })?;
        Ok(row.map(User::from))
    }

    async fn delete(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::delete(&self.pool, id).await?.map(User::from))
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(UserRepo::list(&self.pool)
            .await?
            .into_iter()
            .map(User::from)
            .collect())
    }
}
