//! Storage seams used by the dispatcher, worker, and reconciler.
//!
//! Implementations must apply each mutation atomically per task id; callers
//! never read-modify-write whole records.

use async_trait::async_trait;
use asyncops_core::record::{Claim, NewTask, TaskFilter, TaskRecord};
use asyncops_core::result::SuccessPayload;
use asyncops_core::types::TaskId;
use asyncops_core::user::{CreateUser, UpdateUser, User};

use crate::error::StoreError;

pub mod memory;
pub mod postgres;

pub use memory::{MemoryTaskStore, MemoryUserStore};
pub use postgres::{PgTaskStore, PgUserStore};

/// Durable table of task records.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a new `PENDING` record. Fails with a conflict if the id exists.
    async fn create(&self, input: NewTask) -> Result<TaskRecord, StoreError>;

    async fn get(&self, id: &TaskId) -> Result<Option<TaskRecord>, StoreError>;

    /// Newest first, paged by the filter.
    async fn list(&self, filter: &TaskFilter) -> Result<Vec<TaskRecord>, StoreError>;

    /// Worker claim: move to `PROCESSING`, or report the record as already
    /// terminal. A missing record is [`StoreError::is_not_found`].
    async fn claim(&self, id: &TaskId) -> Result<Claim, StoreError>;

    /// Raise the progress of a `PROCESSING` record, returning the stored
    /// value (which may be higher than `progress`).
    async fn set_progress(&self, id: &TaskId, progress: u8) -> Result<u8, StoreError>;

    /// Terminal success.
    async fn complete(&self, id: &TaskId, payload: &SuccessPayload)
        -> Result<TaskRecord, StoreError>;

    /// Terminal failure, keeping the last recorded progress.
    async fn fail(&self, id: &TaskId, error: &str) -> Result<TaskRecord, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Business-entity store manipulated by task handlers.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Duplicate username or email is a conflict.
    async fn create(&self, input: &CreateUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Merge the provided fields. `None` when the user does not exist.
    async fn update(&self, id: &str, input: &UpdateUser) -> Result<Option<User>, StoreError>;

    /// Remove a user, returning what was removed.
    async fn delete(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Most recently joined first.
    async fn list(&self) -> Result<Vec<User>, StoreError>;
}
