//! Authentication Models
//! Mission: Define user records, token claims, and request/response bodies

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Stored user account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub is_admin: bool,
    pub created_at: String,
}

/// Fields needed to create a user; the store assigns id and timestamp
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid, // subject (user_id)
    pub email: String,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    pub iat: usize, // issued-at timestamp
    pub exp: usize, // expiration timestamp
}

/// Registration request body.
///
/// Fields are kept as raw JSON values so that the duplicate-email lookup can
/// run before any type checks on the remaining fields.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub first_name: Value,
    #[serde(default)]
    pub last_name: Value,
    #[serde(default)]
    pub email: Value,
    #[serde(default)]
    pub password: Value,
    #[serde(default)]
    pub is_admin: Value,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access: String,
}

/// Body shared by password change and account deletion
#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    #[serde(default)]
    pub password: Option<String>,
}

/// User response (sanitized)
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: String,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            created_at: user.created_at.clone(),
        }
    }
}

/// Wrapper for `GET /users/details`
#[derive(Debug, Serialize, Deserialize)]
pub struct DetailsResponse {
    pub user: UserResponse,
}

/// Plain acknowledgement body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$2b$10$secret".to_string(),
            is_admin: false,
            created_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_user_serialization_skips_password() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password").is_none());
        assert_eq!(json["isAdmin"], Value::Bool(false));
    }

    #[test]
    fn test_user_response_has_no_password() {
        let response = UserResponse::from_user(&sample_user());
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("$2b$"));
        assert!(json.contains("\"firstName\":\"Ada\""));
    }

    #[test]
    fn test_claims_role_flag_name() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            is_admin: true,
            iat: 1,
            exp: 2,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["isAdmin"], Value::Bool(true));
    }

    #[test]
    fn test_register_request_accepts_wrong_types() {
        let req: RegisterRequest =
            serde_json::from_str(r#"{"firstName": 42, "email": "a@b.c"}"#).unwrap();
        assert!(req.first_name.is_number());
        assert!(req.last_name.is_null());
        assert_eq!(req.email.as_str(), Some("a@b.c"));
    }
}
