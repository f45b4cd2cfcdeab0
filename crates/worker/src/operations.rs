//! Per-kind business handlers for the user entity.
//!
//! Handlers that target an existing user look it up before the first step,
//! so a missing target fails with progress 0.

use asyncops_core::kind::TaskKind;
use asyncops_core::record::TaskRecord;
use asyncops_core::result::SuccessPayload;
use asyncops_core::user::{validate_input, CreateUser, User, UserPatch, UserRef, ENTITY_USER};
use asyncops_db::store::UserStore;
use serde::de::DeserializeOwned;

use crate::contract::Steps;
use crate::error::TaskFailure;

/// Dispatch on the record's task kind.
pub async fn run(
    record: &TaskRecord,
    users: &dyn UserStore,
    steps: &mut Steps,
) -> Result<SuccessPayload, TaskFailure> {
    match record.task_name {
        TaskKind::CreateEntity => create(decode(record)?, users, steps).await,
        TaskKind::UpdateEntity => update(decode(record)?, users, steps).await,
        TaskKind::DeleteEntity => delete(decode(record)?, users, steps).await,
        TaskKind::GetEntity => get(decode(record)?, users, steps).await,
        TaskKind::ListEntities => list(users, steps).await,
    }
}

fn decode<T: DeserializeOwned>(record: &TaskRecord) -> Result<T, TaskFailure> {
    Ok(serde_json::from_value(record.input_data.clone())?)
}

async fn require(users: &dyn UserStore, user_id: &str) -> Result<User, TaskFailure> {
    users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| TaskFailure::NotFound {
            user_id: user_id.to_string(),
        })
}

async fn create(
    input: CreateUser,
    users: &dyn UserStore,
    steps: &mut Steps,
) -> Result<SuccessPayload, TaskFailure> {
    validate_input(&input)?;
    steps.advance().await?;

    if users.find_by_username(&input.username).await?.is_some() {
        return Err(TaskFailure::Conflict(format!(
            "{ENTITY_USER} with username {} already exists",
            input.username
        )));
    }
    steps.advance().await?;

    if users.find_by_email(&input.email).await?.is_some() {
        return Err(TaskFailure::Conflict(format!(
            "{ENTITY_USER} with email {} already exists",
            input.email
        )));
    }
    steps.advance().await?;

    // The store enforces uniqueness too, for a concurrent create of the same
    // username between the checks above and this insert.
    let user = users.create(&input).await?;
    steps.advance().await?;
    steps.advance().await?;

    Ok(SuccessPayload::Create {
        message: format!("Successfully created user {}", user.username),
        entity_id: user.id,
    })
}

async fn update(
    input: UserPatch,
    users: &dyn UserStore,
    steps: &mut Steps,
) -> Result<SuccessPayload, TaskFailure> {
    require(users, &input.user_id).await?;
    steps.advance().await?;

    validate_input(&input.data)?;
    steps.advance().await?;

    let user = users
        .update(&input.user_id, &input.data)
        .await?
        .ok_or_else(|| TaskFailure::NotFound {
            user_id: input.user_id.clone(),
        })?;
    steps.advance().await?;
    steps.advance().await?;

    Ok(SuccessPayload::Update {
        message: format!("Successfully updated user {}", user.username),
        entity_id: user.id,
    })
}

async fn delete(
    input: UserRef,
    users: &dyn UserStore,
    steps: &mut Steps,
) -> Result<SuccessPayload, TaskFailure> {
    let target = require(users, &input.user_id).await?;
    steps.advance().await?;

    // A concurrent delete may win the race; report what this task saw.
    users.delete(&input.user_id).await?;
    steps.advance().await?;
    steps.advance().await?;

    Ok(SuccessPayload::Delete {
        message: format!("Successfully deleted user {}", target.username),
    })
}

async fn get(
    input: UserRef,
    users: &dyn UserStore,
    steps: &mut Steps,
) -> Result<SuccessPayload, TaskFailure> {
    let user = require(users, &input.user_id).await?;
    steps.advance().await?;
    steps.advance().await?;
    Ok(SuccessPayload::Get { user })
}

async fn list(users: &dyn UserStore, steps: &mut Steps) -> Result<SuccessPayload, TaskFailure> {
    let all = users.list().await?;
    steps.advance().await?;
    steps.advance().await?;
    Ok(SuccessPayload::List { users: all })
}
