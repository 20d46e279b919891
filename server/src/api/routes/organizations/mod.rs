//! Organization, member and invitation endpoints
//!
//! Organization-level calls (create, rename, delete, switch) act on the
//! caller's memberships. Member and invitation calls act on the active
//! organization only; the services reject a path `{org_id}` that differs.

pub mod types;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::api::auth::{Auth, OrgCtx};
use crate::api::extractors::ValidatedJson;
use crate::api::types::{ApiError, OkResponse, ok};
use crate::domain::{InviteOutcome, MembershipService, OrgContext};

use types::{
    DeleteOrgResponse, InvitationDto, InviteRequest, InviteResponse, MemberDto, OrgNameRequest,
    OrgWithRoleDto, OrganizationDto, UpdateMemberRoleRequest,
};

#[derive(Deserialize)]
pub struct MemberPath {
    pub org_id: String,
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct InvitationPath {
    pub org_id: String,
    pub invitation_id: String,
}

/// Shared state for organization endpoints
#[derive(Clone)]
pub struct OrganizationsApiState {
    pub membership: MembershipService,
}

pub fn routes(membership: MembershipService) -> Router {
    let state = OrganizationsApiState { membership };

    Router::new()
        .route("/", get(list_organizations).post(create_org))
        .route("/current", get(current_org))
        .route("/{org_id}", patch(rename_org).delete(delete_org))
        .route("/{org_id}/switch", post(switch_org))
        .route("/{org_id}/members", get(list_members))
        .route("/{org_id}/members/invite", post(invite_member))
        .route(
            "/{org_id}/members/{user_id}",
            patch(update_member_role).delete(remove_member),
        )
        .route("/{org_id}/invitations", get(list_invitations))
        .route(
            "/{org_id}/invitations/{invitation_id}",
            delete(revoke_invitation),
        )
        .route(
            "/{org_id}/invitations/{invitation_id}/resend",
            post(resend_invitation),
        )
        .with_state(state)
}

/// List the caller's organizations
#[utoipa::path(
    get,
    path = "/api/orgs",
    tag = "organizations",
    responses((status = 200, description = "Organizations with the caller's role", body = Vec<OrgWithRoleDto>))
)]
pub async fn list_organizations(
    State(state): State<OrganizationsApiState>,
    OrgCtx(ctx): OrgCtx,
) -> Result<Json<Vec<OrgWithRoleDto>>, ApiError> {
    let orgs = state.membership.list_orgs(&ctx.user_id).await?;
    Ok(Json(
        orgs.into_iter()
            .map(|o| OrgWithRoleDto::new(o, &ctx.active_org_id))
            .collect(),
    ))
}

/// Create an organization with the caller as ADMIN
#[utoipa::path(
    post,
    path = "/api/orgs",
    tag = "organizations",
    request_body = OrgNameRequest,
    responses(
        (status = 201, description = "Organization created", body = OrganizationDto),
        (status = 400, description = "Invalid name")
    )
)]
pub async fn create_org(
    State(state): State<OrganizationsApiState>,
    auth: Auth,
    ValidatedJson(body): ValidatedJson<OrgNameRequest>,
) -> Result<(StatusCode, Json<OrganizationDto>), ApiError> {
    let org = state
        .membership
        .create_org(&auth.identity.id, &body.name)
        .await?;
    Ok((StatusCode::CREATED, Json(org.into())))
}

/// Resolved context for the caller
#[utoipa::path(
    get,
    path = "/api/orgs/current",
    tag = "organizations",
    responses((status = 200, description = "Active organization and role", body = OrgContext))
)]
pub async fn current_org(OrgCtx(ctx): OrgCtx) -> Json<OrgContext> {
    Json(ctx)
}

#[utoipa::path(
    patch,
    path = "/api/orgs/{org_id}",
    tag = "organizations",
    params(("org_id" = String, Path, description = "Organization ID")),
    request_body = OrgNameRequest,
    responses(
        (status = 200, description = "Organization renamed", body = OrganizationDto),
        (status = 403, description = "Caller is not an admin of the organization")
    )
)]
pub async fn rename_org(
    State(state): State<OrganizationsApiState>,
    auth: Auth,
    Path(org_id): Path<String>,
    ValidatedJson(body): ValidatedJson<OrgNameRequest>,
) -> Result<Json<OrganizationDto>, ApiError> {
    let org = state
        .membership
        .rename_org(&auth.identity.id, &org_id, &body.name)
        .await?;
    Ok(Json(org.into()))
}

#[utoipa::path(
    delete,
    path = "/api/orgs/{org_id}",
    tag = "organizations",
    params(("org_id" = String, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Organization deleted", body = DeleteOrgResponse),
        (status = 403, description = "Caller is not an admin of the organization")
    )
)]
pub async fn delete_org(
    State(state): State<OrganizationsApiState>,
    auth: Auth,
    Path(org_id): Path<String>,
) -> Result<Json<DeleteOrgResponse>, ApiError> {
    let next_org_id = state
        .membership
        .delete_org(&auth.identity.id, &org_id)
        .await?;
    Ok(Json(DeleteOrgResponse {
        ok: true,
        next_org_id,
    }))
}

/// Make an organization the caller's active one
#[utoipa::path(
    post,
    path = "/api/orgs/{org_id}/switch",
    tag = "organizations",
    params(("org_id" = String, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "New context", body = OrgContext),
        (status = 403, description = "Not an active member")
    )
)]
pub async fn switch_org(
    State(state): State<OrganizationsApiState>,
    auth: Auth,
    Path(org_id): Path<String>,
) -> Result<Json<OrgContext>, ApiError> {
    let membership = state
        .membership
        .switch_org(&auth.identity.id, &org_id)
        .await?;
    tracing::debug!(user_id = %auth.identity.id, org_id = %org_id, "Switched organization");
    Ok(Json(OrgContext::new(
        membership.user_id,
        membership.organization_id,
        membership.role,
    )))
}

#[utoipa::path(
    get,
    path = "/api/orgs/{org_id}/members",
    tag = "organizations",
    params(("org_id" = String, Path, description = "Organization ID")),
    responses((status = 200, description = "Members", body = Vec<MemberDto>))
)]
pub async fn list_members(
    State(state): State<OrganizationsApiState>,
    OrgCtx(ctx): OrgCtx,
    Path(org_id): Path<String>,
) -> Result<Json<Vec<MemberDto>>, ApiError> {
    let members = state.membership.list_members(&ctx, &org_id).await?;
    Ok(Json(members.into_iter().map(MemberDto::from).collect()))
}

#[utoipa::path(
    patch,
    path = "/api/orgs/{org_id}/members/{user_id}",
    tag = "organizations",
    params(
        ("org_id" = String, Path, description = "Organization ID"),
        ("user_id" = String, Path, description = "Member user ID")
    ),
    request_body = UpdateMemberRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = MemberDto),
        (status = 403, description = "Forbidden or last admin")
    )
)]
pub async fn update_member_role(
    State(state): State<OrganizationsApiState>,
    OrgCtx(ctx): OrgCtx,
    Path(path): Path<MemberPath>,
    ValidatedJson(body): ValidatedJson<UpdateMemberRoleRequest>,
) -> Result<Json<MemberDto>, ApiError> {
    let member = state
        .membership
        .change_role(&ctx, &path.org_id, &path.user_id, body.role)
        .await?;
    Ok(Json(member.into()))
}

#[utoipa::path(
    delete,
    path = "/api/orgs/{org_id}/members/{user_id}",
    tag = "organizations",
    params(
        ("org_id" = String, Path, description = "Organization ID"),
        ("user_id" = String, Path, description = "Member user ID")
    ),
    responses(
        (status = 200, description = "Member removed", body = OkResponse),
        (status = 403, description = "Forbidden or last admin")
    )
)]
pub async fn remove_member(
    State(state): State<OrganizationsApiState>,
    OrgCtx(ctx): OrgCtx,
    Path(path): Path<MemberPath>,
) -> Result<Json<OkResponse>, ApiError> {
    state
        .membership
        .remove_member(&ctx, &path.org_id, &path.user_id)
        .await?;
    Ok(ok())
}

/// Invite an email address to the active organization
#[utoipa::path(
    post,
    path = "/api/orgs/{org_id}/members/invite",
    tag = "organizations",
    params(("org_id" = String, Path, description = "Organization ID")),
    request_body = InviteRequest,
    responses(
        (status = 201, description = "Invitation created", body = InviteResponse),
        (status = 200, description = "Already a member", body = InviteResponse),
        (status = 403, description = "Forbidden or invitations disabled")
    )
)]
pub async fn invite_member(
    State(state): State<OrganizationsApiState>,
    OrgCtx(ctx): OrgCtx,
    Path(org_id): Path<String>,
    ValidatedJson(body): ValidatedJson<InviteRequest>,
) -> Result<Response, ApiError> {
    let outcome = state
        .membership
        .invite(&ctx, &org_id, &body.email, body.role)
        .await?;
    Ok(match outcome {
        InviteOutcome::Invited(invitation) => {
            (StatusCode::CREATED, Json(InviteResponse::from(invitation))).into_response()
        }
        InviteOutcome::AlreadyMember => Json(InviteResponse::AlreadyMember).into_response(),
    })
}

#[utoipa::path(
    get,
    path = "/api/orgs/{org_id}/invitations",
    tag = "organizations",
    params(("org_id" = String, Path, description = "Organization ID")),
    responses((status = 200, description = "Pending invitations", body = Vec<InvitationDto>))
)]
pub async fn list_invitations(
    State(state): State<OrganizationsApiState>,
    OrgCtx(ctx): OrgCtx,
    Path(org_id): Path<String>,
) -> Result<Json<Vec<InvitationDto>>, ApiError> {
    let invitations = state.membership.list_invitations(&ctx, &org_id).await?;
    Ok(Json(
        invitations.into_iter().map(InvitationDto::from).collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/orgs/{org_id}/invitations/{invitation_id}/resend",
    tag = "organizations",
    params(
        ("org_id" = String, Path, description = "Organization ID"),
        ("invitation_id" = String, Path, description = "Invitation ID")
    ),
    responses(
        (status = 200, description = "Invitation touched", body = InvitationDto),
        (status = 404, description = "No pending invitation")
    )
)]
pub async fn resend_invitation(
    State(state): State<OrganizationsApiState>,
    OrgCtx(ctx): OrgCtx,
    Path(path): Path<InvitationPath>,
) -> Result<Json<InvitationDto>, ApiError> {
    let invitation = state
        .membership
        .resend_invitation(&ctx, &path.org_id, &path.invitation_id)
        .await?;
    Ok(Json(invitation.into()))
}

#[utoipa::path(
    delete,
    path = "/api/orgs/{org_id}/invitations/{invitation_id}",
    tag = "organizations",
    params(
        ("org_id" = String, Path, description = "Organization ID"),
        ("invitation_id" = String, Path, description = "Invitation ID")
    ),
    responses(
        (status = 200, description = "Invitation revoked", body = OkResponse),
        (status = 404, description = "No pending invitation")
    )
)]
pub async fn revoke_invitation(
    State(state): State<OrganizationsApiState>,
    OrgCtx(ctx): OrgCtx,
    Path(path): Path<InvitationPath>,
) -> Result<Json<OkResponse>, ApiError> {
    state
        .membership
        .revoke_invitation(&ctx, &path.org_id, &path.invitation_id)
        .await?;
    Ok(ok())
}
