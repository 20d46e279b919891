//! Identity, tenant and membership rows

use serde::{Deserialize, Serialize};

use super::enums::{InvitationStatus, MemberStatus, Role};

// ============================================================================
// User types
// ============================================================================

/// User row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Per-user preferences; `last_active_org_id` is cleared when its org is deleted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfileRow {
    pub user_id: String,
    pub last_active_org_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

// ============================================================================
// Organization types
// ============================================================================

/// Organization row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationRow {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub created_by_user_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Organization with the caller's ACTIVE role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgWithRole {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub role: Role,
    pub created_at: i64,
    pub updated_at: i64,
}

// ============================================================================
// Membership types
// ============================================================================

/// Membership row from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipRow {
    pub organization_id: String,
    pub user_id: String,
    pub role: Role,
    pub status: MemberStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl MembershipRow {
    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }
}

/// Member with user info (for list_members)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberWithUser {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub status: MemberStatus,
    pub joined_at: i64,
}

/// Outcome of a membership mutation guarded by the last-admin invariant
#[derive(Debug, Clone, PartialEq)]
pub enum LastAdminResult<T> {
    Success(T),
    LastAdmin,
    NotFound,
}

// ============================================================================
// Invitation types
// ============================================================================

/// Invitation row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationRow {
    pub id: String,
    pub organization_id: String,
    pub email: String,
    pub role: Role,
    pub token: String,
    pub expires_at: i64,
    pub status: InvitationStatus,
    pub invited_by_user_id: Option<String>,
    pub accepted_by_user_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields for a new invitation
#[derive(Debug, Clone)]
pub struct NewInvitation<'a> {
    pub organization_id: &'a str,
    pub email: &'a str,
    pub role: Role,
    pub token: &'a str,
    pub expires_at: i64,
    pub invited_by_user_id: &'a str,
}
