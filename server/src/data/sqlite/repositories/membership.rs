//! Organization membership repository for SQLite operations
//!
//! Removal is soft: the row stays with status REMOVED. Role and status changes
//! that could leave an organization without an ACTIVE ADMIN are checked inside
//! the same transaction as the write.

use sqlx::{Sqlite, SqlitePool, Transaction};

use super::decode;
use crate::data::sqlite::SqliteError;
use crate::data::types::{LastAdminResult, MemberStatus, MemberWithUser, MembershipRow, Role};

type MembershipTuple = (String, String, String, String, i64, i64);
type MemberTuple = (String, String, Option<String>, String, String, i64);

fn to_row(
    (organization_id, user_id, role, status, created_at, updated_at): MembershipTuple,
) -> Result<MembershipRow, SqliteError> {
    Ok(MembershipRow {
        organization_id,
        user_id,
        role: decode("role", &role, Role::parse)?,
        status: decode("status", &status, MemberStatus::parse)?,
        created_at,
        updated_at,
    })
}

fn to_member(
    (user_id, email, name, role, status, joined_at): MemberTuple,
) -> Result<MemberWithUser, SqliteError> {
    Ok(MemberWithUser {
        user_id,
        email,
        name,
        role: decode("role", &role, Role::parse)?,
        status: decode("status", &status, MemberStatus::parse)?,
        joined_at,
    })
}

/// Get a specific membership regardless of status
pub async fn get_membership(
    pool: &SqlitePool,
    org_id: &str,
    user_id: &str,
) -> Result<Option<MembershipRow>, SqliteError> {
    let row = sqlx::query_as::<_, MembershipTuple>(
        r#"
        SELECT organization_id, user_id, role, status, created_at, updated_at
        FROM organization_members
        WHERE organization_id = ? AND user_id = ?
        "#,
    )
    .bind(org_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(to_row).transpose()
}

/// ACTIVE memberships of a user, oldest first (ties broken by org id)
pub async fn list_active_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<MembershipRow>, SqliteError> {
    let rows = sqlx::query_as::<_, MembershipTuple>(
        r#"
        SELECT organization_id, user_id, role, status, created_at, updated_at
        FROM organization_members
        WHERE user_id = ? AND status = 'ACTIVE'
        ORDER BY created_at ASC, organization_id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(to_row).collect()
}

/// Members of an organization with user info, excluding REMOVED rows
pub async fn list_members(
    pool: &SqlitePool,
    org_id: &str,
) -> Result<Vec<MemberWithUser>, SqliteError> {
    let rows = sqlx::query_as::<_, MemberTuple>(
        r#"
        SELECT u.id, u.email, u.name, om.role, om.status, om.created_at
        FROM organization_members om
        JOIN users u ON om.user_id = u.id
        WHERE om.organization_id = ? AND om.status != 'REMOVED'
        ORDER BY om.created_at ASC, u.email ASC
        "#,
    )
    .bind(org_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(to_member).collect()
}

/// Get a single member with user info
pub async fn get_member_with_user(
    pool: &SqlitePool,
    org_id: &str,
    user_id: &str,
) -> Result<Option<MemberWithUser>, SqliteError> {
    let row = sqlx::query_as::<_, MemberTuple>(
        r#"
        SELECT u.id, u.email, u.name, om.role, om.status, om.created_at
        FROM organization_members om
        JOIN users u ON om.user_id = u.id
        WHERE om.organization_id = ? AND om.user_id = ?
        "#,
    )
    .bind(org_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(to_member).transpose()
}

/// Count ACTIVE admins of an organization
pub async fn count_active_admins(pool: &SqlitePool, org_id: &str) -> Result<i64, SqliteError> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM organization_members WHERE organization_id = ? AND role = 'ADMIN' AND status = 'ACTIVE'",
    )
    .bind(org_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Whether `email` belongs to an ACTIVE member of the organization
pub async fn is_active_member_email(
    pool: &SqlitePool,
    org_id: &str,
    email: &str,
) -> Result<bool, SqliteError> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT 1
        FROM organization_members om
        JOIN users u ON om.user_id = u.id
        WHERE om.organization_id = ? AND u.email = ? AND om.status = 'ACTIVE'
        "#,
    )
    .bind(org_id)
    .bind(email.trim().to_lowercase())
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

/// Loads the non-REMOVED membership and decides whether losing it would drop
/// the last ACTIVE ADMIN. `None` means the member does not exist.
async fn guard_last_admin(
    tx: &mut Transaction<'_, Sqlite>,
    org_id: &str,
    user_id: &str,
    keeps_admin: bool,
) -> Result<Option<bool>, SqliteError> {
    let row = sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT role, status FROM organization_members
        WHERE organization_id = ? AND user_id = ? AND status != 'REMOVED'
        "#,
    )
    .bind(org_id)
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?;

    let Some((role, status)) = row else {
        return Ok(None);
    };

    let is_active_admin = role == Role::Admin.as_str() && status == MemberStatus::Active.as_str();
    if !is_active_admin || keeps_admin {
        return Ok(Some(false));
    }

    let (admins,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM organization_members WHERE organization_id = ? AND role = 'ADMIN' AND status = 'ACTIVE'",
    )
    .bind(org_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(Some(admins <= 1))
}

fn blocked_result<T>(guard: Option<bool>) -> LastAdminResult<T> {
    match guard {
        None => LastAdminResult::NotFound,
        _ => LastAdminResult::LastAdmin,
    }
}

/// Change a member's role, refusing to demote the last ACTIVE ADMIN
pub async fn update_role_guarded(
    pool: &SqlitePool,
    org_id: &str,
    user_id: &str,
    new_role: Role,
) -> Result<LastAdminResult<MembershipRow>, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    match guard_last_admin(&mut tx, org_id, user_id, new_role == Role::Admin).await? {
        Some(false) => {}
        blocked => {
            tx.rollback().await?;
            return Ok(blocked_result(blocked));
        }
    }

    sqlx::query(
        "UPDATE organization_members SET role = ?, updated_at = ? WHERE organization_id = ? AND user_id = ?",
    )
    .bind(new_role.as_str())
    .bind(now)
    .bind(org_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    get_membership(pool, org_id, user_id)
        .await
        .map(|opt| opt.map_or(LastAdminResult::NotFound, LastAdminResult::Success))
}

/// Soft-remove a member, refusing to remove the last ACTIVE ADMIN
pub async fn remove_member_guarded(
    pool: &SqlitePool,
    org_id: &str,
    user_id: &str,
) -> Result<LastAdminResult<()>, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    match guard_last_admin(&mut tx, org_id, user_id, false).await? {
        Some(false) => {}
        blocked => {
            tx.rollback().await?;
            return Ok(blocked_result(blocked));
        }
    }

    sqlx::query(
        "UPDATE organization_members SET status = 'REMOVED', updated_at = ? WHERE organization_id = ? AND user_id = ?",
    )
    .bind(now)
    .bind(org_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(LastAdminResult::Success(()))
}
