//! Organization API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::types::{timestamp, trimmed};
use crate::data::types::{
    InvitationRow, InvitationStatus, MemberStatus, MemberWithUser, OrgWithRole, OrganizationRow,
    Role,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationDto {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrganizationRow> for OrganizationDto {
    fn from(row: OrganizationRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            created_at: timestamp(row.created_at),
            updated_at: timestamp(row.updated_at),
        }
    }
}

/// Organization with the caller's role
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrgWithRoleDto {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub role: Role,
    /// Whether this is the caller's active organization
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrgWithRoleDto {
    pub fn new(row: OrgWithRole, active_org_id: &str) -> Self {
        Self {
            is_active: row.id == active_org_id,
            id: row.id,
            name: row.name,
            slug: row.slug,
            role: row.role,
            created_at: timestamp(row.created_at),
            updated_at: timestamp(row.updated_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub status: MemberStatus,
    pub joined_at: DateTime<Utc>,
}

impl From<MemberWithUser> for MemberDto {
    fn from(row: MemberWithUser) -> Self {
        Self {
            user_id: row.user_id,
            email: row.email,
            name: row.name,
            role: row.role,
            status: row.status,
            joined_at: timestamp(row.joined_at),
        }
    }
}

/// Pending invitation, token omitted
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvitationDto {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
    pub invited_by_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InvitationRow> for InvitationDto {
    fn from(row: InvitationRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            role: row.role,
            status: row.status,
            expires_at: timestamp(row.expires_at),
            invited_by_user_id: row.invited_by_user_id,
            created_at: timestamp(row.created_at),
            updated_at: timestamp(row.updated_at),
        }
    }
}

/// Create or rename an organization
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OrgNameRequest {
    #[validate(length(min = 1, max = 1000, message = "Organization name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMemberRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct InviteRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    pub role: Role,
}

/// Result of an invite call
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InviteResponse {
    /// Invitation created; the token is returned once for out-of-band delivery
    Invited {
        id: String,
        email: String,
        role: Role,
        token: String,
        #[serde(rename = "expiresAt")]
        expires_at: DateTime<Utc>,
    },
    /// The email already belongs to an active member
    AlreadyMember,
}

impl From<InvitationRow> for InviteResponse {
    fn from(row: InvitationRow) -> Self {
        Self::Invited {
            id: row.id,
            email: row.email,
            role: row.role,
            token: row.token,
            expires_at: timestamp(row.expires_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOrgResponse {
    pub ok: bool,
    /// Organization the caller falls back to, if any
    pub next_org_id: Option<String>,
}
