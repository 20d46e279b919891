//! Organization invitation repository for SQLite operations

use sqlx::SqlitePool;

use super::decode;
use crate::data::sqlite::SqliteError;
use crate::data::types::{InvitationRow, InvitationStatus, MemberStatus, NewInvitation, Role};

const INVITATION_COLUMNS: &str = "id, organization_id, email, role, token, expires_at, status, invited_by_user_id, accepted_by_user_id, created_at, updated_at";

type InvitationTuple = (
    String,
    String,
    String,
    String,
    String,
    i64,
    String,
    Option<String>,
    Option<String>,
    i64,
    i64,
);

fn to_row(
    (
        id,
        organization_id,
        email,
        role,
        token,
        expires_at,
        status,
        invited_by_user_id,
        accepted_by_user_id,
        created_at,
        updated_at,
    ): InvitationTuple,
) -> Result<InvitationRow, SqliteError> {
    Ok(InvitationRow {
        id,
        organization_id,
        email,
        role: decode("role", &role, Role::parse)?,
        token,
        expires_at,
        status: decode("status", &status, InvitationStatus::parse)?,
        invited_by_user_id,
        accepted_by_user_id,
        created_at,
        updated_at,
    })
}

/// Create a PENDING invitation
pub async fn create_invitation(
    pool: &SqlitePool,
    new: &NewInvitation<'_>,
) -> Result<InvitationRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();
    let email = new.email.trim().to_lowercase();

    sqlx::query(&format!(
        "INSERT INTO organization_invitations ({INVITATION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, 'PENDING', ?, NULL, ?, ?)"
    ))
    .bind(&id)
    .bind(new.organization_id)
    .bind(&email)
    .bind(new.role.as_str())
    .bind(new.token)
    .bind(new.expires_at)
    .bind(new.invited_by_user_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(InvitationRow {
        id,
        organization_id: new.organization_id.to_string(),
        email,
        role: new.role,
        token: new.token.to_string(),
        expires_at: new.expires_at,
        status: InvitationStatus::Pending,
        invited_by_user_id: Some(new.invited_by_user_id.to_string()),
        accepted_by_user_id: None,
        created_at: now,
        updated_at: now,
    })
}

/// Get an invitation scoped to its organization
pub async fn get_invitation(
    pool: &SqlitePool,
    org_id: &str,
    id: &str,
) -> Result<Option<InvitationRow>, SqliteError> {
    let row = sqlx::query_as::<_, InvitationTuple>(&format!(
        "SELECT {INVITATION_COLUMNS} FROM organization_invitations WHERE organization_id = ? AND id = ?"
    ))
    .bind(org_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(to_row).transpose()
}

/// PENDING invitations of an organization, newest first
pub async fn list_pending(
    pool: &SqlitePool,
    org_id: &str,
) -> Result<Vec<InvitationRow>, SqliteError> {
    let rows = sqlx::query_as::<_, InvitationTuple>(&format!(
        "SELECT {INVITATION_COLUMNS} FROM organization_invitations WHERE organization_id = ? AND status = 'PENDING' ORDER BY created_at DESC, id ASC"
    ))
    .bind(org_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(to_row).collect()
}

/// Bump `updated_at` of a PENDING invitation; token and expiry are untouched
pub async fn touch_pending(
    pool: &SqlitePool,
    org_id: &str,
    id: &str,
) -> Result<Option<InvitationRow>, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query(
        "UPDATE organization_invitations SET updated_at = ? WHERE organization_id = ? AND id = ? AND status = 'PENDING'",
    )
    .bind(now)
    .bind(org_id)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_invitation(pool, org_id, id).await
}

/// Hard-delete a PENDING invitation
pub async fn delete_pending(pool: &SqlitePool, org_id: &str, id: &str) -> Result<bool, SqliteError> {
    let result = sqlx::query(
        "DELETE FROM organization_invitations WHERE organization_id = ? AND id = ? AND status = 'PENDING'",
    )
    .bind(org_id)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// PENDING, unexpired invitations addressed to `email`, oldest first
pub async fn list_acceptable(
    pool: &SqlitePool,
    email: &str,
    now: i64,
) -> Result<Vec<InvitationRow>, SqliteError> {
    let rows = sqlx::query_as::<_, InvitationTuple>(&format!(
        "SELECT {INVITATION_COLUMNS} FROM organization_invitations WHERE email = ? AND status = 'PENDING' AND expires_at > ? ORDER BY created_at ASC, id ASC"
    ))
    .bind(email.trim().to_lowercase())
    .bind(now)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(to_row).collect()
}

/// Accept an invitation on behalf of `user_id`
///
/// Marks the invitation ACCEPTED only if it is still PENDING, then inserts or
/// reactivates the membership with the invited role. An already ACTIVE
/// membership keeps its role. Returns `false` when another resolution won the
/// race, in which case nothing is written.
pub async fn accept_invitation(
    pool: &SqlitePool,
    invitation: &InvitationRow,
    user_id: &str,
) -> Result<bool, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    let claimed = sqlx::query(
        r#"
        UPDATE organization_invitations
        SET status = 'ACCEPTED', accepted_by_user_id = ?, updated_at = ?
        WHERE id = ? AND status = 'PENDING'
        "#,
    )
    .bind(user_id)
    .bind(now)
    .bind(&invitation.id)
    .execute(&mut *tx)
    .await?;

    if claimed.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query(
        r#"
        INSERT INTO organization_members (organization_id, user_id, role, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(organization_id, user_id) DO UPDATE SET
            role = excluded.role,
            status = excluded.status,
            updated_at = excluded.updated_at
        WHERE organization_members.status != 'ACTIVE'
        "#,
    )
    .bind(&invitation.organization_id)
    .bind(user_id)
    .bind(invitation.role.as_str())
    .bind(MemberStatus::Active.as_str())
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::repositories::membership;

    async fn setup_test_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        sqlx::query(crate::data::sqlite::schema::SCHEMA)
            .execute(&pool)
            .await
            .unwrap();
        for id in ["admin", "bob"] {
            sqlx::query("INSERT INTO users (id, email, created_at, updated_at) VALUES (?, ?, 0, 0)")
                .bind(id)
                .bind(format!("{}@x.com", id))
                .execute(&pool)
                .await
                .unwrap();
        }
        sqlx::query(
            "INSERT INTO organizations (id, name, slug, created_at, updated_at) VALUES ('o1', 'Org', 'org', 0, 0)",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    async fn invite(pool: &SqlitePool, email: &str, token: &str, expires_at: i64) -> InvitationRow {
        create_invitation(
            pool,
            &NewInvitation {
                organization_id: "o1",
                email,
                role: Role::Editor,
                token,
                expires_at,
                invited_by_user_id: "admin",
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_lowercases_email() {
        let pool = setup_test_pool().await;
        let inv = invite(&pool, "Bob@X.com", "t1", i64::MAX).await;
        assert_eq!(inv.email, "bob@x.com");
        assert_eq!(inv.status, InvitationStatus::Pending);

        let fetched = get_invitation(&pool, "o1", &inv.id).await.unwrap().unwrap();
        assert_eq!(fetched.token, "t1");
        assert!(get_invitation(&pool, "other", &inv.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_acceptable_skips_expired() {
        let pool = setup_test_pool().await;
        invite(&pool, "bob@x.com", "fresh", 2_000).await;
        invite(&pool, "bob@x.com", "stale", 500).await;

        let rows = list_acceptable(&pool, "BOB@x.com", 1_000).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].token, "fresh");
    }

    #[tokio::test]
    async fn test_accept_once() {
        let pool = setup_test_pool().await;
        let inv = invite(&pool, "bob@x.com", "t1", i64::MAX).await;

        assert!(accept_invitation(&pool, &inv, "bob").await.unwrap());
        assert!(!accept_invitation(&pool, &inv, "bob").await.unwrap());

        let m = membership::get_membership(&pool, "o1", "bob").await.unwrap().unwrap();
        assert!(m.is_active());
        assert_eq!(m.role, Role::Editor);

        let stored = get_invitation(&pool, "o1", &inv.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InvitationStatus::Accepted);
        assert_eq!(stored.accepted_by_user_id.as_deref(), Some("bob"));
        assert!(list_pending(&pool, "o1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accept_reactivates_removed_member() {
        let pool = setup_test_pool().await;
        sqlx::query(
            "INSERT INTO organization_members (organization_id, user_id, role, status, created_at, updated_at) VALUES ('o1', 'bob', 'VIEWER', 'REMOVED', 0, 0)",
        )
        .execute(&pool)
        .await
        .unwrap();
        let inv = invite(&pool, "bob@x.com", "t1", i64::MAX).await;

        assert!(accept_invitation(&pool, &inv, "bob").await.unwrap());
        let m = membership::get_membership(&pool, "o1", "bob").await.unwrap().unwrap();
        assert_eq!(m.status, MemberStatus::Active);
        assert_eq!(m.role, Role::Editor);
    }

    #[tokio::test]
    async fn test_accept_keeps_active_role() {
        let pool = setup_test_pool().await;
        sqlx::query(
            "INSERT INTO organization_members (organization_id, user_id, role, status, created_at, updated_at) VALUES ('o1', 'bob', 'ADMIN', 'ACTIVE', 0, 0)",
        )
        .execute(&pool)
        .await
        .unwrap();
        let inv = invite(&pool, "bob@x.com", "t1", i64::MAX).await;

        assert!(accept_invitation(&pool, &inv, "bob").await.unwrap());
        let m = membership::get_membership(&pool, "o1", "bob").await.unwrap().unwrap();
        assert_eq!(m.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_touch_and_delete_pending_only() {
        let pool = setup_test_pool().await;
        let inv = invite(&pool, "bob@x.com", "t1", i64::MAX).await;

        let touched = touch_pending(&pool, "o1", &inv.id).await.unwrap().unwrap();
        assert_eq!(touched.token, inv.token);
        assert_eq!(touched.expires_at, inv.expires_at);

        accept_invitation(&pool, &inv, "bob").await.unwrap();
        assert!(touch_pending(&pool, "o1", &inv.id).await.unwrap().is_none());
        assert!(!delete_pending(&pool, "o1", &inv.id).await.unwrap());

        let other = invite(&pool, "carol@x.com", "t2", i64::MAX).await;
        assert!(delete_pending(&pool, "o1", &other.id).await.unwrap());
        assert!(get_invitation(&pool, "o1", &other.id).await.unwrap().is_none());
    }
}
