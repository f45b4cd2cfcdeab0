//! In-process stores.
//!
//! Each store keeps its rows behind a single `RwLock`; every mutation takes
//! the write lock for the whole read-modify-write, which gives the same
//! per-record atomicity the PostgreSQL guarded updates provide. Used by tests
//! and by the single-process `memory` backend.

use std::collections::HashMap;

use async_trait::async_trait;
use asyncops_core::error::CoreError;
use asyncops_core::record::{Claim, NewTask, TaskFilter, TaskRecord};
use asyncops_core::result::SuccessPayload;
use asyncops_core::types::TaskId;
use asyncops_core::user::{CreateUser, UpdateUser, User, ENTITY_USER};
use chrono::Utc;
use tokio::sync::RwLock;

use super::{TaskStore, UserStore};
use crate::error::StoreError;

const ENTITY_TASK: &str = "Task";

#[derive(Default)]
pub struct MemoryTaskStore {
    records: RwLock<HashMap<TaskId, TaskRecord>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `f` to one record under the write lock and return a snapshot.
    async fn mutate<T>(
        &self,
        id: &TaskId,
        f: impl FnOnce(&mut TaskRecord) -> Result<T, CoreError>,
    ) -> Result<(T, TaskRecord), StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(ENTITY_TASK, id.as_str()))?;
        let out = f(record)?;
        Ok((out, record.clone()))
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create(&self, input: NewTask) -> Result<TaskRecord, StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&input.id) {
            return Err(CoreError::Conflict(format!("Task {} already exists", input.id)).into());
        }
        let record = TaskRecord::new(input, Utc::now());
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, id: &TaskId) -> Result<Option<TaskRecord>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<TaskRecord>, StoreError> {
        let records = self.records.read().await;
        let mut matched: Vec<TaskRecord> = records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(matched
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit() as usize)
            .collect())
    }

    async fn claim(&self, id: &TaskId) -> Result<Claim, StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(ENTITY_TASK, id.as_str()))?;
        if record.status.is_terminal() {
            return Ok(Claim::AlreadyTerminal(record.clone()));
        }
        record.claim(Utc::now())?;
        Ok(Claim::Acquired(record.clone()))
    }

    async fn set_progress(&self, id: &TaskId, progress: u8) -> Result<u8, StoreError> {
        let (stored, _) = self
            .mutate(id, |r| r.record_progress(progress, Utc::now()))
            .await?;
        Ok(stored)
    }

    async fn complete(
        &self,
        id: &TaskId,
        payload: &SuccessPayload,
    ) -> Result<TaskRecord, StoreError> {
        let ((), record) = self
            .mutate(id, |r| r.succeed(payload.clone(), Utc::now()))
            .await?;
        Ok(record)
    }

    async fn fail(&self, id: &TaskId, error: &str) -> Result<TaskRecord, StoreError> {
        let ((), record) = self.mutate(id, |r| r.fail(error, Utc::now())).await?;
        Ok(record)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Reject a username or email already held by a different user.
fn check_unique(
    users: &HashMap<String, User>,
    except_id: Option<&str>,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<(), CoreError> {
    for user in users.values() {
        if Some(user.id.as_str()) == except_id {
            continue;
        }
        if let Some(username) = username.filter(|u| *u == user.username) {
            return Err(CoreError::Conflict(format!(
                "{ENTITY_USER} with username {username} already exists"
            )));
        }
        if let Some(email) = email.filter(|e| *e == user.email) {
            return Err(CoreError::Conflict(format!(
                "{ENTITY_USER} with email {email} already exists"
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, input: &CreateUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        check_unique(&users, None, Some(&input.username), Some(&input.email))?;
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: input.username.clone(),
            email: input.email.clone(),
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            is_active: input.is_active,
            date_joined: Utc::now(),
        };
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update(&self, id: &str, input: &UpdateUser) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        if !users.contains_key(id) {
            return Ok(None);
        }
        check_unique(
            &users,
            Some(id),
            input.username.as_deref(),
            input.email.as_deref(),
        )?;
        let Some(user) = users.get_mut(id) else {
            return Ok(None);
        };
        input.apply_to(user);
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.write().await.remove(id))
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| b.date_joined.cmp(&a.date_joined).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use asyncops_core::kind::TaskKind;
    use asyncops_core::status::{Operation, TaskStatus};

    use super::*;

    fn new_task(id: &str) -> NewTask {
        NewTask {
            id: TaskId::from(id),
            task_name: TaskKind::ListEntities,
            related_table: Some("user".into()),
            related_id: None,
            operation: Some(Operation::Read),
            input_data: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn duplicate_task_id_is_a_conflict() {
        let store = MemoryTaskStore::new();
        store.create(new_task("t-1")).await.unwrap();
        assert_matches!(
            store.create(new_task("t-1")).await,
            Err(StoreError::Core(CoreError::Conflict(_)))
        );
    }

    #[tokio::test]
    async fn claim_of_missing_record_is_not_found() {
        let store = MemoryTaskStore::new();
        let err = store.claim(&TaskId::from("nope")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn claim_of_terminal_record_reports_it() {
        let store = MemoryTaskStore::new();
        store.create(new_task("t-1")).await.unwrap();
        store.fail(&TaskId::from("t-1"), "boom").await.unwrap();
        assert_matches!(
            store.claim(&TaskId::from("t-1")).await.unwrap(),
            Claim::AlreadyTerminal(r) if r.status == TaskStatus::Failed
        );
    }

    #[tokio::test]
    async fn progress_on_pending_record_is_rejected() {
        let store = MemoryTaskStore::new();
        store.create(new_task("t-1")).await.unwrap();
        assert_matches!(
            store.set_progress(&TaskId::from("t-1"), 50).await,
            Err(StoreError::Core(CoreError::InvalidTransition { .. }))
        );
    }

    #[tokio::test]
    async fn user_uniqueness_is_enforced() {
        let store = MemoryUserStore::new();
        let input = CreateUser {
            username: "alice".into(),
            email: "a@x.com".into(),
            first_name: String::new(),
            last_name: String::new(),
            is_active: true,
        };
        store.create(&input).await.unwrap();

        let same_email = CreateUser {
            username: "alice2".into(),
            ..input.clone()
        };
        let err = store.create(&same_email).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Conflict: User with email a@x.com already exists"
        );
    }

    #[tokio::test]
    async fn update_may_keep_own_username() {
        let store = MemoryUserStore::new();
        let user = store
            .create(&CreateUser {
                username: "alice".into(),
                email: "a@x.com".into(),
                first_name: String::new(),
                last_name: String::new(),
                is_active: true,
            })
            .await
            .unwrap();
        let patch = UpdateUser {
            username: Some("alice".into()),
            first_name: Some("Alice".into()),
            ..Default::default()
        };
        let updated = store.update(&user.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.first_name, "Alice");
    }
}
