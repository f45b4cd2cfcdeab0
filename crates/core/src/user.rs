//! The business entity manipulated by tasks, plus its input DTOs.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Entity name used in not-found and conflict messages.
pub const ENTITY_USER: &str = "User";

/// A user record as seen by workers and in task results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub date_joined: Timestamp,
}

/// Input for `create_entity`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[validate(email, length(max = 254))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub last_name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Input for `update_entity`. Only provided fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email, length(max = 254))]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UpdateUser {
    /// Merge the provided fields into `user`.
    pub fn apply_to(&self, user: &mut User) {
        if let Some(username) = &self.username {
            user.username = username.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(first_name) = &self.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
    }
}

/// Run `validator` rules and fold the failures into a single
/// [`CoreError::Validation`] message.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), CoreError> {
    input.validate().map_err(|errors| {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let codes: Vec<&str> = errs.iter().map(|e| e.code.as_ref()).collect();
                format!("{field}: {}", codes.join(", "))
            })
            .collect();
        fields.sort();
        CoreError::Validation(fields.join("; "))
    })
}

/// `input_data` of `delete_entity` and `get_entity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub user_id: String,
}

/// `input_data` of `update_entity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPatch {
    pub user_id: String,
    pub data: UpdateUser,
}

/// Message for a missing user, shared by update/delete/get.
pub fn not_found_message(user_id: &str) -> String {
    format!("{ENTITY_USER} with ID {user_id} does not exist")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User {
            id: "u-1".into(),
            username: "alice".into(),
            email: "a@x.com".into(),
            first_name: String::new(),
            last_name: String::new(),
            is_active: true,
            date_joined: chrono::Utc::now(),
        }
    }

    #[test]
    fn create_defaults_optional_fields() {
        let input: CreateUser =
            serde_json::from_value(serde_json::json!({"username": "alice", "email": "a@x.com"}))
                .unwrap();
        assert!(input.is_active);
        assert_eq!(input.first_name, "");
        assert!(validate_input(&input).is_ok());
    }

    #[test]
    fn invalid_email_is_rejected() {
        let input: CreateUser =
            serde_json::from_value(serde_json::json!({"username": "bob", "email": "nope"}))
                .unwrap();
        let err = validate_input(&input).unwrap_err();
        assert!(err.to_string().contains("email"), "got: {err}");
    }

    #[test]
    fn email_longer_than_column_is_rejected() {
        let label = "x".repeat(60);
        let email = format!("a@{label}.{label}.{label}.{label}.abcde.com");
        let create = CreateUser {
            username: "bob".into(),
            email: email.clone(),
            first_name: String::new(),
            last_name: String::new(),
            is_active: true,
        };
        assert!(validate_input(&create).is_err());

        let update = UpdateUser {
            email: Some(email),
            ..Default::default()
        };
        assert!(validate_input(&update).is_err());
    }

    #[test]
    fn empty_username_is_rejected() {
        let input: CreateUser =
            serde_json::from_value(serde_json::json!({"username": "", "email": "b@x.com"}))
                .unwrap();
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn update_applies_only_provided_fields() {
        let mut user = alice();
        let patch = UpdateUser {
            last_name: Some("Liddell".into()),
            is_active: Some(false),
            ..Default::default()
        };
        patch.apply_to(&mut user);
        assert_eq!(user.username, "alice");
        assert_eq!(user.last_name, "Liddell");
        assert!(!user.is_active);
    }

    #[test]
    fn patch_input_shape() {
        let patch: UserPatch = serde_json::from_value(serde_json::json!({
            "user_id": "u-1",
            "data": {"email": "new@x.com"}
        }))
        .unwrap();
        assert_eq!(patch.user_id, "u-1");
        assert_eq!(patch.data.email.as_deref(), Some("new@x.com"));
        assert!(patch.data.username.is_none());
    }

    #[test]
    fn not_found_message_contains_id() {
        assert_eq!(
            not_found_message("missing-id"),
            "User with ID missing-id does not exist"
        );
    }
}
