//! Provider API key repository for SQLite operations
//!
//! Keys arrive here already encrypted; this layer never sees plaintext.

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::ProviderKeyRow;

const KEY_COLUMNS: &str = "id, organization_id, user_id, provider, encrypted_key, key_hint, is_active, created_at, updated_at";

type KeyTuple = (String, String, String, String, String, String, bool, i64, i64);

fn to_row(
    (id, organization_id, user_id, provider, encrypted_key, key_hint, is_active, created_at, updated_at): KeyTuple,
) -> ProviderKeyRow {
    ProviderKeyRow {
        id,
        organization_id,
        user_id,
        provider,
        encrypted_key,
        key_hint,
        is_active,
        created_at,
        updated_at,
    }
}

/// All keys of an organization ordered by provider
pub async fn list_keys(pool: &SqlitePool, org_id: &str) -> Result<Vec<ProviderKeyRow>, SqliteError> {
    let rows = sqlx::query_as::<_, KeyTuple>(&format!(
        "SELECT {KEY_COLUMNS} FROM provider_api_keys WHERE organization_id = ? ORDER BY provider ASC"
    ))
    .bind(org_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(to_row).collect())
}

/// Insert or replace the key for `(org, provider)` and mark it active
pub async fn upsert_key(
    pool: &SqlitePool,
    org_id: &str,
    user_id: &str,
    provider: &str,
    encrypted_key: &str,
    key_hint: &str,
) -> Result<ProviderKeyRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO provider_api_keys (id, organization_id, user_id, provider, encrypted_key, key_hint, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
        ON CONFLICT(organization_id, provider) DO UPDATE SET
            user_id = excluded.user_id,
            encrypted_key = excluded.encrypted_key,
            key_hint = excluded.key_hint,
            is_active = 1,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&id)
    .bind(org_id)
    .bind(user_id)
    .bind(provider)
    .bind(encrypted_key)
    .bind(key_hint)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    get_key(pool, org_id, provider)
        .await?
        .ok_or_else(|| SqliteError::Conflict(format!("{} key vanished after upsert", provider)))
}

/// Key for a provider regardless of its active flag
pub async fn get_key(
    pool: &SqlitePool,
    org_id: &str,
    provider: &str,
) -> Result<Option<ProviderKeyRow>, SqliteError> {
    let row = sqlx::query_as::<_, KeyTuple>(&format!(
        "SELECT {KEY_COLUMNS} FROM provider_api_keys WHERE organization_id = ? AND provider = ?"
    ))
    .bind(org_id)
    .bind(provider)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(to_row))
}

/// Active key for a provider
pub async fn get_active_key(
    pool: &SqlitePool,
    org_id: &str,
    provider: &str,
) -> Result<Option<ProviderKeyRow>, SqliteError> {
    Ok(get_key(pool, org_id, provider)
        .await?
        .filter(|row| row.is_active))
}

/// Clear the active flag; returns whether an active key existed
pub async fn deactivate_key(
    pool: &SqlitePool,
    org_id: &str,
    provider: &str,
) -> Result<bool, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query(
        "UPDATE provider_api_keys SET is_active = 0, updated_at = ? WHERE organization_id = ? AND provider = ? AND is_active = 1",
    )
    .bind(now)
    .bind(org_id)
    .bind(provider)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        sqlx::query(crate::data::sqlite::schema::SCHEMA)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO organizations (id, name, slug, created_at, updated_at) VALUES ('o1', 'Org', 'org', 0, 0)",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_reactivates() {
        let pool = setup_test_pool().await;
        let first = upsert_key(&pool, "o1", "u1", "openai", "enc1", "1111")
            .await
            .unwrap();
        assert!(first.is_active);

        assert!(deactivate_key(&pool, "o1", "openai").await.unwrap());
        assert!(!deactivate_key(&pool, "o1", "openai").await.unwrap());
        assert!(get_active_key(&pool, "o1", "openai").await.unwrap().is_none());

        let second = upsert_key(&pool, "o1", "u2", "openai", "enc2", "2222")
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert!(second.is_active);
        assert_eq!(second.key_hint, "2222");
        assert_eq!(second.encrypted_key, "enc2");

        assert_eq!(list_keys(&pool, "o1").await.unwrap().len(), 1);
        assert!(get_active_key(&pool, "o1", "openai").await.unwrap().is_some());
        assert!(get_active_key(&pool, "o2", "openai").await.unwrap().is_none());
    }
}
