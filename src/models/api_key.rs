//! API key model for CI-triggered scans.
//!
//! The full key string has the form `shk_<prefix>_<secret>`. Only the prefix
//! (for lookup) and an argon2 hash of the secret are stored; the plaintext
//! is returned exactly once, at creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Full API key row (includes secret_hash — never serialize to API).
#[derive(Debug, Clone, FromRow)]
pub struct ApiKey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub prefix: String,
    pub secret_hash: String,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// API key response DTO — excludes the secret hash.
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub name: String,
    pub prefix: String,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(k: ApiKey) -> Self {
        Self {
            id: k.id,
            name: k.name,
            prefix: k.prefix,
            is_active: k.is_active,
            expires_at: k.expires_at,
            last_used: k.last_used,
            created_at: k.created_at,
        }
    }
}

/// Creation response: the only place the plaintext key ever appears.
#[derive(Debug, Serialize)]
pub struct CreatedApiKey {
    pub api_key: String,
    pub details: ApiKeyResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateApiKey {
    pub name: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_excludes_secret_hash() {
        let key = ApiKey {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            name: "ci".to_string(),
            prefix: "abcd1234".to_string(),
            secret_hash: "$argon2id$v=19$...".to_string(),
            is_active: true,
            expires_at: None,
            last_used: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&ApiKeyResponse::from(key)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("abcd1234"));
    }
}
