use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use crate::authz::{Scope, ScopeSet};
use crate::db::begin_write;
use crate::errors::{AppError, AppResult};
use crate::models::api_key::{ApiKey, DbApiKey};
use crate::store::parse_scopes;

const KEY_PREFIX: &str = "mks_";

fn digest(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

fn generate_key() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    format!("{KEY_PREFIX}{}", hex::encode(bytes))
}

fn join_scopes(scopes: &[Scope]) -> String {
    scopes.iter().map(Scope::as_str).collect::<Vec<_>>().join(" ")
}

impl From<DbApiKey> for ApiKey {
    fn from(db: DbApiKey) -> Self {
        ApiKey {
            uuid: db.uuid,
            label: db.label,
            scopes: parse_scopes(db.scopes.split_whitespace().map(String::from)),
            created_at: db.created_at,
        }
    }
}

/// Create a key. The plain key is only ever returned from here.
pub async fn issue(pool: &SqlitePool, label: &str, scopes: &[Scope], now: i64) -> AppResult<(String, ApiKey)> {
    if label.trim().is_empty() {
        return Err(AppError::bad_request("api key label must not be empty"));
    }

    let key = generate_key();
    let api_key = ApiKey {
        uuid: uuid::Uuid::new_v4().to_string(),
        label: label.to_string(),
        scopes: scopes.to_vec(),
        created_at: now,
    };

    sqlx::query("INSERT INTO api_keys (uuid, label, key_hash, scopes, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(&api_key.uuid)
        .bind(&api_key.label)
        .bind(digest(&key))
        .bind(join_scopes(scopes))
        .bind(api_key.created_at)
        .execute(pool)
        .await?;

    tracing::info!(api_key_uuid = %api_key.uuid, label, "api key issued");
    Ok((key, api_key))
}

pub async fn list(pool: &SqlitePool) -> AppResult<Vec<ApiKey>> {
    let rows = sqlx::query_as::<_, DbApiKey>(
        "SELECT uuid, label, scopes, created_at FROM api_keys ORDER BY created_at ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(ApiKey::from).collect())
}

/// Returns the revoked key's metadata.
pub async fn revoke(pool: &SqlitePool, uuid: &str) -> AppResult<ApiKey> {
    let mut tx = begin_write(pool).await?;
    let row = sqlx::query_as::<_, DbApiKey>("SELECT uuid, label, scopes, created_at FROM api_keys WHERE uuid = ?")
        .bind(uuid)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(format!("api key `{uuid}` not found")))?;

    sqlx::query("DELETE FROM api_keys WHERE uuid = ?")
        .bind(uuid)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(row.into())
}

/// Scopes stored with `key`. An unknown key resolves to nothing.
pub async fn scopes_for_key(pool: &SqlitePool, key: &str) -> AppResult<ScopeSet> {
    let stored: Option<String> = sqlx::query_scalar("SELECT scopes FROM api_keys WHERE key_hash = ?")
        .bind(digest(key))
        .fetch_optional(pool)
        .await?;

    Ok(stored
        .map(|names| parse_scopes(names.split_whitespace().map(String::from)))
        .unwrap_or_default()
        .into_iter()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_prefixed_and_unique() {
        let a = generate_key();
        let b = generate_key();
        assert!(a.starts_with(KEY_PREFIX));
        assert_eq!(a.len(), KEY_PREFIX.len() + 64);
        assert_ne!(a, b);
    }

    #[test]
    fn digest_is_stable_hex() {
        assert_eq!(digest("abc"), digest("abc"));
        assert_eq!(digest("abc").len(), 64);
        assert_ne!(digest("abc"), digest("abd"));
    }

    #[test]
    fn scopes_are_space_joined() {
        assert_eq!(join_scopes(&[Scope::GetShifts, Scope::Admin]), "get_shifts admin");
    }
}
