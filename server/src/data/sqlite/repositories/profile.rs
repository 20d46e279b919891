//! User profile repository for SQLite operations

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::UserProfileRow;

/// Create the profile row if absent (no-op otherwise)
pub async fn ensure_profile(pool: &SqlitePool, user_id: &str) -> Result<(), SqliteError> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        "INSERT OR IGNORE INTO user_profiles (user_id, last_active_org_id, created_at, updated_at) VALUES (?, NULL, ?, ?)",
    )
    .bind(user_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_profile(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<UserProfileRow>, SqliteError> {
    let row = sqlx::query_as::<_, (String, Option<String>, i64, i64)>(
        "SELECT user_id, last_active_org_id, created_at, updated_at FROM user_profiles WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(
        |(user_id, last_active_org_id, created_at, updated_at)| UserProfileRow {
            user_id,
            last_active_org_id,
            created_at,
            updated_at,
        },
    ))
}

/// Upsert the profile's active organization
pub async fn set_last_active_org(
    pool: &SqlitePool,
    user_id: &str,
    org_id: Option<&str>,
) -> Result<(), SqliteError> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        r#"
        INSERT INTO user_profiles (user_id, last_active_org_id, created_at, updated_at) VALUES (?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            last_active_org_id = excluded.last_active_org_id,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id)
    .bind(org_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
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
            "INSERT INTO users (id, email, created_at, updated_at) VALUES ('u1', 'u1@x.com', 0, 0)",
        )
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
    async fn test_ensure_profile_is_idempotent() {
        let pool = setup_test_pool().await;
        ensure_profile(&pool, "u1").await.unwrap();
        set_last_active_org(&pool, "u1", Some("o1")).await.unwrap();
        ensure_profile(&pool, "u1").await.unwrap();

        let profile = get_profile(&pool, "u1").await.unwrap().unwrap();
        assert_eq!(profile.last_active_org_id.as_deref(), Some("o1"));
    }

    #[tokio::test]
    async fn test_set_last_active_org_creates_profile() {
        let pool = setup_test_pool().await;
        assert!(get_profile(&pool, "u1").await.unwrap().is_none());

        set_last_active_org(&pool, "u1", Some("o1")).await.unwrap();
        assert!(get_profile(&pool, "u1").await.unwrap().is_some());

        set_last_active_org(&pool, "u1", None).await.unwrap();
        let profile = get_profile(&pool, "u1").await.unwrap().unwrap();
        assert!(profile.last_active_org_id.is_none());
    }
}
