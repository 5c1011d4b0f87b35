//! User model. Platform-wide authority is limited to the superuser flag;
//! everything else is granted per project through memberships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Full user row from database (includes password_hash — never serialize to API).
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_superuser: bool,
    pub is_active: bool,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User response DTO — excludes password_hash and internal fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_superuser: bool,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            is_superuser: u.is_superuser,
            is_active: u.is_active,
            last_login: u.last_login,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_superuser: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_response_excludes_password() {
        let json = serde_json::to_string(&UserResponse {
            id: Uuid::nil(),
            username: "admin".to_string(),
            email: "admin@test.com".to_string(),
            is_superuser: true,
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
        })
        .unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("hash"));
    }

    #[test]
    fn user_to_response_conversion() {
        let user = User {
            id: Uuid::nil(),
            username: "test".to_string(),
            email: "test@test.com".to_string(),
            password_hash: "secret_hash".to_string(),
            is_superuser: false,
            is_active: true,
            failed_login_attempts: 0,
            locked_until: None,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let response: UserResponse = user.into();
        assert_eq!(response.username, "test");
        assert!(!response.is_superuser);
    }

    #[test]
    fn create_user_defaults_to_non_superuser() {
        let input: CreateUser = serde_json::from_str(
            r#"{"username":"u","email":"u@test.com","password":"pw"}"#,
        )
        .unwrap();
        assert!(!input.is_superuser);
    }
}
