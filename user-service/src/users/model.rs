//! User record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Number;

use super::coerce;

/// Fields accepted when creating a user. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewUser {
    #[serde(default, deserialize_with = "coerce::optional_string")]
    pub user_name: Option<String>,

    #[serde(default, deserialize_with = "coerce::optional_number")]
    pub user_age: Option<Number>,

    #[serde(default, deserialize_with = "coerce::optional_string")]
    pub user_gender: Option<String>,
}

/// A stored user record as exposed over the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Identifier assigned on creation
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_age: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_gender: Option<String>,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    /// Equal to `created_at`; records are never modified
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,

    /// Revision counter, always 0
    #[serde(rename = "__v")]
    pub version: u32,
}

/// Body returned by the create endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct UserCreated {
    pub message: String,
    pub user: User,
}

impl UserCreated {
    pub fn new(user: User) -> Self {
        Self {
            message: "User created successfully".to_string(),
            user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_user_all_fields() {
        let user: NewUser =
            serde_json::from_value(json!({"user_name": "Ana", "user_age": 30, "user_gender": "F"}))
                .unwrap();
        assert_eq!(user.user_name.as_deref(), Some("Ana"));
        assert_eq!(user.user_age, Some(Number::from(30)));
        assert_eq!(user.user_gender.as_deref(), Some("F"));
    }

    #[test]
    fn test_new_user_partial_and_unknown_fields() {
        let user: NewUser =
            serde_json::from_value(json!({"user_name": "Bo", "nickname": "b"})).unwrap();
        assert_eq!(user.user_name.as_deref(), Some("Bo"));
        assert!(user.user_age.is_none());
        assert!(user.user_gender.is_none());
    }

    #[test]
    fn test_new_user_rejects_uncastable_age() {
        let result: Result<NewUser, _> = serde_json::from_value(json!({"user_age": [30]}));
        assert!(result.is_err());
    }

    #[test]
    fn test_user_serializes_with_wire_names() {
        let ts = DateTime::parse_from_rfc3339("2026-01-02T03:04:05.678Z")
            .unwrap()
            .with_timezone(&Utc);
        let user = User {
            id: "abc".to_string(),
            user_name: Some("Ana".to_string()),
            user_age: Some(Number::from(30)),
            user_gender: None,
            created_at: ts,
            updated_at: ts,
            version: 0,
        };

        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["_id"], "abc");
        assert_eq!(value["user_age"], 30);
        assert_eq!(value["createdAt"], "2026-01-02T03:04:05.678Z");
        assert_eq!(value["updatedAt"], value["createdAt"]);
        assert_eq!(value["__v"], 0);
        assert!(value.get("user_gender").is_none());
    }

    #[test]
    fn test_user_created_message() {
        let body = UserCreated::new(User {
            id: "x".to_string(),
            user_name: None,
            user_age: None,
            user_gender: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 0,
        });
        assert_eq!(body.message, "User created successfully");
    }
}
