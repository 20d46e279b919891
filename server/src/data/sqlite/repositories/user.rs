//! User repository for SQLite operations

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::UserRow;

type UserTuple = (String, String, Option<String>, i64, i64);

fn to_row((id, email, name, created_at, updated_at): UserTuple) -> UserRow {
    UserRow {
        id,
        email,
        name,
        created_at,
        updated_at,
    }
}

/// Insert a user by email, or refresh the name of the existing one
///
/// Emails are stored lower-cased so lookups are case-insensitive.
pub async fn upsert_user(
    pool: &SqlitePool,
    email: &str,
    name: Option<&str>,
) -> Result<UserRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();
    let email = email.trim().to_lowercase();

    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, created_at, updated_at) VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(email) DO UPDATE SET
            name = COALESCE(excluded.name, users.name),
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&id)
    .bind(&email)
    .bind(name)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    get_by_email(pool, &email)
        .await?
        .ok_or_else(|| SqliteError::Conflict(format!("user {} vanished after upsert", email)))
}

/// Get a user by ID
pub async fn get_user(pool: &SqlitePool, id: &str) -> Result<Option<UserRow>, SqliteError> {
    let row = sqlx::query_as::<_, UserTuple>(
        "SELECT id, email, name, created_at, updated_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(to_row))
}

/// Get a user by email (case-insensitive)
pub async fn get_by_email(pool: &SqlitePool, email: &str) -> Result<Option<UserRow>, SqliteError> {
    let row = sqlx::query_as::<_, UserTuple>(
        "SELECT id, email, name, created_at, updated_at FROM users WHERE email = ?",
    )
    .bind(email.trim().to_lowercase())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(to_row))
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
        pool
    }

    #[tokio::test]
    async fn test_upsert_creates_then_reuses() {
        let pool = setup_test_pool().await;

        let first = upsert_user(&pool, "Alice@Example.com", Some("Alice"))
            .await
            .unwrap();
        assert_eq!(first.email, "alice@example.com");
        assert_eq!(first.name.as_deref(), Some("Alice"));

        let second = upsert_user(&pool, "alice@example.com", None).await.unwrap();
        assert_eq!(second.id, first.id);
        // A missing name does not erase the stored one
        assert_eq!(second.name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_get_by_email_case_insensitive() {
        let pool = setup_test_pool().await;
        let user = upsert_user(&pool, "bob@x.com", None).await.unwrap();

        let found = get_by_email(&pool, "BOB@X.COM").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(get_user(&pool, &user.id).await.unwrap().is_some());
        assert!(get_user(&pool, "missing").await.unwrap().is_none());
    }
}
