//! API key service: generation, authentication, and lifecycle.
//!
//! Keys look like `shk_<prefix>_<secret>`. The prefix is stored in clear for
//! lookup; the secret is stored only as a salted argon2 hash, so the
//! plaintext cannot be recovered after creation.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::api_key::{ApiKey, ApiKeyResponse, CreateApiKey, CreatedApiKey};
use crate::models::user::User;

/// Key scheme tag, also the lookup namespace for the Authorization header.
const KEY_SCHEME: &str = "shk";

/// Length of the clear-text lookup prefix.
const PREFIX_LEN: usize = 8;

/// Generate a fresh key pair: (prefix, secret, full plaintext key).
fn generate_key_material() -> (String, String, String) {
    let prefix: String = Uuid::new_v4().simple().to_string()[..PREFIX_LEN].to_string();
    let secret = format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    );
    let full = format!("{KEY_SCHEME}_{prefix}_{secret}");
    (prefix, secret, full)
}

/// Split a presented key into (prefix, secret). Returns None on malformed input.
fn split_key(full_key: &str) -> Option<(&str, &str)> {
    let mut parts = full_key.splitn(3, '_');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(prefix), Some(secret))
            if scheme == KEY_SCHEME && prefix.len() == PREFIX_LEN && !secret.is_empty() =>
        {
            Some((prefix, secret))
        }
        _ => None,
    }
}

fn hash_secret(secret: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Key hashing failed: {e}")))
}

fn verify_secret(secret: &str, hash: &str) -> Result<bool, AppError> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok())
}

/// Create a new API key for a user. The plaintext is returned here and
/// never again.
pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    input: &CreateApiKey,
) -> Result<CreatedApiKey, AppError> {
    let (prefix, secret, full_key) = generate_key_material();
    let secret_hash = hash_secret(&secret)?;

    let key = sqlx::query_as::<_, ApiKey>(
        r#"
        INSERT INTO api_keys (user_id, name, prefix, secret_hash, expires_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&input.name)
    .bind(&prefix)
    .bind(&secret_hash)
    .bind(input.expires_at)
    .fetch_one(pool)
    .await?;

    Ok(CreatedApiKey {
        api_key: full_key,
        details: ApiKeyResponse::from(key),
    })
}

/// Authenticate a presented key: prefix lookup, hash match, active and
/// unexpired key, active owning user. Bumps `last_used` on success.
pub async fn authenticate(pool: &PgPool, full_key: &str) -> Result<(User, ApiKey), AppError> {
    let (prefix, secret) = split_key(full_key).ok_or(AppError::Unauthorized)?;

    let key = sqlx::query_as::<_, ApiKey>(
        "SELECT * FROM api_keys WHERE prefix = $1 AND is_active = true",
    )
    .bind(prefix)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    if let Some(expires_at) = key.expires_at {
        if expires_at < Utc::now() {
            return Err(AppError::Unauthorized);
        }
    }

    if !verify_secret(secret, &key.secret_hash)? {
        return Err(AppError::Unauthorized);
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_active = true")
        .bind(key.user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::Unauthorized)?;

    sqlx::query("UPDATE api_keys SET last_used = NOW() WHERE id = $1")
        .bind(key.id)
        .execute(pool)
        .await?;

    Ok((user, key))
}

/// List a user's own keys, newest first.
pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<ApiKeyResponse>, AppError> {
    let keys = sqlx::query_as::<_, ApiKey>(
        "SELECT * FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(keys.into_iter().map(ApiKeyResponse::from).collect())
}

/// Deactivate a key. Owners can revoke their own keys; superusers any key.
pub async fn revoke(
    pool: &PgPool,
    key_id: Uuid,
    caller_id: Uuid,
    caller_is_superuser: bool,
) -> Result<(), AppError> {
    let key = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE id = $1")
        .bind(key_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("API key not found".to_string()))?;

    if key.user_id != caller_id && !caller_is_superuser {
        // Collapse to NotFound so foreign key ids are not enumerable
        return Err(AppError::NotFound("API key not found".to_string()));
    }

    sqlx::query("UPDATE api_keys SET is_active = false WHERE id = $1")
        .bind(key_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_material_format() {
        let (prefix, secret, full) = generate_key_material();
        assert_eq!(prefix.len(), PREFIX_LEN);
        assert_eq!(secret.len(), 64);
        assert_eq!(full, format!("shk_{prefix}_{secret}"));
    }

    #[test]
    fn key_material_is_unique() {
        let (_, _, a) = generate_key_material();
        let (_, _, b) = generate_key_material();
        assert_ne!(a, b);
    }

    #[test]
    fn split_valid_key() {
        let (prefix, secret, full) = generate_key_material();
        let (p, s) = split_key(&full).unwrap();
        assert_eq!(p, prefix);
        assert_eq!(s, secret);
    }

    #[test]
    fn split_rejects_malformed_keys() {
        assert!(split_key("").is_none());
        assert!(split_key("shk_short").is_none());
        assert!(split_key("ssk_abcd1234_secret").is_none());
        assert!(split_key("shk_abcd1234_").is_none());
        assert!(split_key("shk_toolongprefix_secret").is_none());
    }

    #[test]
    fn secret_hash_roundtrip() {
        let (_, secret, _) = generate_key_material();
        let hash = hash_secret(&secret).unwrap();
        assert_ne!(hash, secret);
        assert!(verify_secret(&secret, &hash).unwrap());
        assert!(!verify_secret("wrong-secret", &hash).unwrap());
    }
}
