//! Organization repository for SQLite operations

use sqlx::SqlitePool;

use super::decode;
use crate::data::sqlite::SqliteError;
use crate::data::types::{MemberStatus, OrgWithRole, OrganizationRow, Role};

type OrgTuple = (String, String, String, Option<String>, i64, i64);

fn to_row((id, name, slug, created_by_user_id, created_at, updated_at): OrgTuple) -> OrganizationRow {
    OrganizationRow {
        id,
        name,
        slug,
        created_by_user_id,
        created_at,
        updated_at,
    }
}

/// Create an organization and its first ADMIN in one transaction
///
/// A taken slug surfaces as a unique violation and nothing is written.
pub async fn create_organization_with_admin(
    pool: &SqlitePool,
    name: &str,
    slug: &str,
    user_id: &str,
) -> Result<OrganizationRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();

    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        "INSERT INTO organizations (id, name, slug, created_by_user_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(slug)
    .bind(user_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await;

    if let Err(e) = inserted {
        tx.rollback().await?;
        return Err(e.into());
    }

    sqlx::query(
        r#"
        INSERT INTO organization_members (organization_id, user_id, role, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(Role::Admin.as_str())
    .bind(MemberStatus::Active.as_str())
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(OrganizationRow {
        id,
        name: name.to_string(),
        slug: slug.to_string(),
        created_by_user_id: Some(user_id.to_string()),
        created_at: now,
        updated_at: now,
    })
}

pub async fn slug_exists(pool: &SqlitePool, slug: &str) -> Result<bool, SqliteError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM organizations WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Get an organization by ID
pub async fn get_organization(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<OrganizationRow>, SqliteError> {
    let row = sqlx::query_as::<_, OrgTuple>(
        "SELECT id, name, slug, created_by_user_id, created_at, updated_at FROM organizations WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(to_row))
}

/// Rename an organization, returning the updated row
pub async fn update_name(
    pool: &SqlitePool,
    id: &str,
    name: &str,
) -> Result<Option<OrganizationRow>, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query("UPDATE organizations SET name = ?, updated_at = ? WHERE id = ?")
        .bind(name)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_organization(pool, id).await
}

/// Hard-delete an organization
///
/// Profiles pointing at it are cleared in the same transaction; tenant rows
/// go with the cascade.
pub async fn delete_organization(pool: &SqlitePool, id: &str) -> Result<bool, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE user_profiles SET last_active_org_id = NULL, updated_at = ? WHERE last_active_org_id = ?",
    )
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let result = sqlx::query("DELETE FROM organizations WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

/// Organizations where the user holds an ACTIVE membership, oldest membership first
pub async fn list_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<OrgWithRole>, SqliteError> {
    let rows = sqlx::query_as::<_, (String, String, String, String, i64, i64)>(
        r#"
        SELECT o.id, o.name, o.slug, om.role, o.created_at, o.updated_at
        FROM organizations o
        JOIN organization_members om ON om.organization_id = o.id
        WHERE om.user_id = ? AND om.status = 'ACTIVE'
        ORDER BY om.created_at ASC, o.id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(id, name, slug, role, created_at, updated_at)| {
            Ok(OrgWithRole {
                id,
                name,
                slug,
                role: decode("role", &role, Role::parse)?,
                created_at,
                updated_at,
            })
        })
        .collect()
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
        for id in ["u1", "u2"] {
            sqlx::query("INSERT INTO users (id, email, created_at, updated_at) VALUES (?, ?, 0, 0)")
                .bind(id)
                .bind(format!("{}@x.com", id))
                .execute(&pool)
                .await
                .unwrap();
        }
        pool
    }

    #[tokio::test]
    async fn test_create_with_admin() {
        let pool = setup_test_pool().await;
        let org = create_organization_with_admin(&pool, "Acme", "acme", "u1")
            .await
            .unwrap();

        assert!(slug_exists(&pool, "acme").await.unwrap());
        let orgs = list_for_user(&pool, "u1").await.unwrap();
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].id, org.id);
        assert_eq!(orgs[0].role, Role::Admin);
        assert!(list_for_user(&pool, "u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_slug_writes_nothing() {
        let pool = setup_test_pool().await;
        create_organization_with_admin(&pool, "Acme", "acme", "u1")
            .await
            .unwrap();

        let err = create_organization_with_admin(&pool, "Other", "acme", "u2")
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
        assert!(list_for_user(&pool, "u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_skips_removed_memberships() {
        let pool = setup_test_pool().await;
        let org = create_organization_with_admin(&pool, "Acme", "acme", "u1")
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO organization_members (organization_id, user_id, role, status, created_at, updated_at) VALUES (?, 'u2', 'EDITOR', 'REMOVED', 0, 0)",
        )
        .bind(&org.id)
        .execute(&pool)
        .await
        .unwrap();

        assert!(list_for_user(&pool, "u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_name() {
        let pool = setup_test_pool().await;
        let org = create_organization_with_admin(&pool, "Acme", "acme", "u1")
            .await
            .unwrap();

        let renamed = update_name(&pool, &org.id, "Acme Inc").await.unwrap().unwrap();
        assert_eq!(renamed.name, "Acme Inc");
        assert_eq!(renamed.slug, "acme");
        assert!(update_name(&pool, "missing", "X y").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_clears_profiles_and_cascades() {
        let pool = setup_test_pool().await;
        let org = create_organization_with_admin(&pool, "Acme", "acme", "u1")
            .await
            .unwrap();
        crate::data::sqlite::repositories::profile::set_last_active_org(&pool, "u1", Some(&org.id))
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO prompts (id, organization_id, user_id, name, content, created_at, updated_at) VALUES ('p1', ?, 'u1', 'P', '', 0, 0)",
        )
        .bind(&org.id)
        .execute(&pool)
        .await
        .unwrap();

        assert!(delete_organization(&pool, &org.id).await.unwrap());

        let profile = crate::data::sqlite::repositories::profile::get_profile(&pool, "u1")
            .await
            .unwrap()
            .unwrap();
        assert!(profile.last_active_org_id.is_none());

        let (prompts,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM prompts")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(prompts, 0);
        assert!(list_for_user(&pool, "u1").await.unwrap().is_empty());
        assert!(!delete_organization(&pool, &org.id).await.unwrap());
    }
}
