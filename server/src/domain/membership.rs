//! Organization, membership and invitation management
//!
//! Operations on another organization (rename, delete, switch) are gated on
//! the caller's membership in that organization. Member and invitation
//! operations are gated on the resolved context: the target organization
//! must be the active one and the role must grant the action.

use std::sync::Arc;

use super::error::{DomainError, DomainResult};
use super::org_context::OrgContext;
use super::rbac::{Action, Resource};
use crate::core::constants::{
    INVITATION_TOKEN_BYTES, INVITATION_TTL_DAYS, ORG_NAME_MAX_LEN, ORG_NAME_MIN_LEN,
    ORG_SLUG_MAX_ATTEMPTS,
};
use crate::data::types::{
    InvitationRow, LastAdminResult, MemberStatus, MemberWithUser, MembershipRow, NewInvitation,
    OrgWithRole, OrganizationRow, Role,
};
use crate::data::{DataError, TransactionalRepository, TransactionalService};
use crate::utils::crypto::generate_token;
use crate::utils::string::slugify;

const SECONDS_PER_DAY: i64 = 86_400;

/// Result of an invitation request
#[derive(Debug, Clone)]
pub enum InviteOutcome {
    /// The email already belongs to an ACTIVE member; nothing was created
    AlreadyMember,
    Invited(InvitationRow),
}

#[derive(Clone)]
pub struct MembershipService {
    database: Arc<TransactionalService>,
    invitations_enabled: bool,
}

impl MembershipService {
    pub fn new(database: Arc<TransactionalService>, invitations_enabled: bool) -> Self {
        Self {
            database,
            invitations_enabled,
        }
    }

    fn repo(&self) -> Box<dyn TransactionalRepository + Send + Sync> {
        self.database.repository()
    }

    // ==================== Organizations ====================

    /// Organizations the user is an ACTIVE member of
    pub async fn list_orgs(&self, user_id: &str) -> DomainResult<Vec<OrgWithRole>> {
        Ok(self.repo().list_orgs_for_user(user_id).await?)
    }

    /// Create an organization with the caller as ADMIN
    pub async fn create_org(&self, user_id: &str, name: &str) -> DomainResult<OrganizationRow> {
        let name = validate_org_name(name)?;
        let repo = self.repo();
        let base_slug = slugify(&name);

        for attempt in 0..ORG_SLUG_MAX_ATTEMPTS {
            let slug = if attempt == 0 {
                base_slug.clone()
            } else {
                format!("{}-{}", base_slug, attempt)
            };
            if repo.slug_exists(&slug).await? {
                continue;
            }
            match repo.create_organization_with_admin(&name, &slug, user_id).await {
                Ok(org) => {
                    tracing::info!(org_id = %org.id, slug = %org.slug, user_id, "Organization created");
                    return Ok(org);
                }
                Err(e) if e.is_conflict() => {
                    tracing::debug!(slug = %slug, "Slug taken concurrently, trying next");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(DataError::Conflict(format!("no free slug for '{}'", base_slug)).into())
    }

    pub async fn rename_org(
        &self,
        user_id: &str,
        org_id: &str,
        name: &str,
    ) -> DomainResult<OrganizationRow> {
        let name = validate_org_name(name)?;
        let repo = self.repo();
        require_admin_of(repo.as_ref(), org_id, user_id).await?;

        repo.update_organization_name(org_id, &name)
            .await?
            .ok_or(DomainError::NotFound("Organization"))
    }

    /// Hard-delete an organization; returns another org the caller can use next
    pub async fn delete_org(&self, user_id: &str, org_id: &str) -> DomainResult<Option<String>> {
        let repo = self.repo();
        require_admin_of(repo.as_ref(), org_id, user_id).await?;

        let next_org_id = repo
            .list_active_memberships(user_id)
            .await?
            .into_iter()
            .map(|m| m.organization_id)
            .find(|id| id != org_id);

        if !repo.delete_organization(org_id).await? {
            return Err(DomainError::NotFound("Organization"));
        }

        tracing::info!(org_id, user_id, "Organization deleted");
        Ok(next_org_id)
    }

    /// Make `org_id` the caller's active organization
    pub async fn switch_org(&self, user_id: &str, org_id: &str) -> DomainResult<MembershipRow> {
        let repo = self.repo();
        let membership = repo
            .get_membership(org_id, user_id)
            .await?
            .filter(MembershipRow::is_active)
            .ok_or_else(|| DomainError::forbidden("Not a member of this organization"))?;

        repo.ensure_profile(user_id).await?;
        repo.set_last_active_org(user_id, Some(org_id)).await?;
        Ok(membership)
    }

    // ==================== Members ====================

    pub async fn list_members(
        &self,
        ctx: &OrgContext,
        org_id: &str,
    ) -> DomainResult<Vec<MemberWithUser>> {
        ctx.require_active_org(org_id)?;
        ctx.require(Action::Read, Resource::Members)?;
        Ok(self.repo().list_members(org_id).await?)
    }

    pub async fn change_role(
        &self,
        ctx: &OrgContext,
        org_id: &str,
        user_id: &str,
        role: Role,
    ) -> DomainResult<MemberWithUser> {
        ctx.require_active_org(org_id)?;
        ctx.require(Action::Manage, Resource::Members)?;
        let repo = self.repo();
        require_member(repo.as_ref(), org_id, user_id).await?;

        match repo.update_member_role(org_id, user_id, role).await? {
            LastAdminResult::Success(_) => {}
            LastAdminResult::LastAdmin => return Err(DomainError::LastAdmin),
            LastAdminResult::NotFound => return Err(DomainError::NotFound("Member")),
        }

        tracing::info!(org_id, user_id, role = %role, changed_by = %ctx.user_id, "Member role changed");
        require_member(repo.as_ref(), org_id, user_id).await
    }

    /// Soft-remove a member (status REMOVED)
    pub async fn remove_member(
        &self,
        ctx: &OrgContext,
        org_id: &str,
        user_id: &str,
    ) -> DomainResult<()> {
        ctx.require_active_org(org_id)?;
        ctx.require(Action::Manage, Resource::Members)?;
        let repo = self.repo();
        require_member(repo.as_ref(), org_id, user_id).await?;

        match repo.remove_member(org_id, user_id).await? {
            LastAdminResult::Success(()) => {
                tracing::info!(org_id, user_id, removed_by = %ctx.user_id, "Member removed");
                Ok(())
            }
            LastAdminResult::LastAdmin => Err(DomainError::LastAdmin),
            LastAdminResult::NotFound => Err(DomainError::NotFound("Member")),
        }
    }

    // ==================== Invitations ====================

    pub async fn invite(
        &self,
        ctx: &OrgContext,
        org_id: &str,
        email: &str,
        role: Role,
    ) -> DomainResult<InviteOutcome> {
        if !self.invitations_enabled {
            return Err(DomainError::forbidden("Invitations are disabled"));
        }
        ctx.require(Action::Manage, Resource::Members)?;
        ctx.require_active_org(org_id)?;

        let email = email.trim().to_lowercase();
        if email.len() < 3 || !email.contains('@') {
            return Err(DomainError::validation("A valid email is required"));
        }

        let repo = self.repo();
        if repo.is_active_member_email(org_id, &email).await? {
            return Ok(InviteOutcome::AlreadyMember);
        }

        let token = generate_token(INVITATION_TOKEN_BYTES);
        let expires_at = chrono::Utc::now().timestamp() + INVITATION_TTL_DAYS * SECONDS_PER_DAY;
        let invitation = repo
            .create_invitation(&NewInvitation {
                organization_id: org_id,
                email: &email,
                role,
                token: &token,
                expires_at,
                invited_by_user_id: &ctx.user_id,
            })
            .await?;

        tracing::info!(
            org_id,
            invitation_id = %invitation.id,
            role = %role,
            invited_by = %ctx.user_id,
            "Invitation created"
        );
        Ok(InviteOutcome::Invited(invitation))
    }

    pub async fn list_invitations(
        &self,
        ctx: &OrgContext,
        org_id: &str,
    ) -> DomainResult<Vec<InvitationRow>> {
        ctx.require_active_org(org_id)?;
        ctx.require(Action::Manage, Resource::Members)?;
        Ok(self.repo().list_pending_invitations(org_id).await?)
    }

    /// Record a resend; the token and expiry are left unchanged
    pub async fn resend_invitation(
        &self,
        ctx: &OrgContext,
        org_id: &str,
        invitation_id: &str,
    ) -> DomainResult<InvitationRow> {
        ctx.require_active_org(org_id)?;
        ctx.require(Action::Manage, Resource::Members)?;

        let invitation = self
            .repo()
            .touch_invitation(org_id, invitation_id)
            .await?
            .ok_or(DomainError::NotFound("Invitation"))?;
        tracing::info!(org_id, invitation_id, "Invitation resent");
        Ok(invitation)
    }

    pub async fn revoke_invitation(
        &self,
        ctx: &OrgContext,
        org_id: &str,
        invitation_id: &str,
    ) -> DomainResult<()> {
        ctx.require_active_org(org_id)?;
        ctx.require(Action::Manage, Resource::Members)?;

        if !self
            .repo()
            .delete_pending_invitation(org_id, invitation_id)
            .await?
        {
            return Err(DomainError::NotFound("Invitation"));
        }
        tracing::info!(org_id, invitation_id, "Invitation revoked");
        Ok(())
    }
}

/// Trimmed name within the allowed length
fn validate_org_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    let len = name.chars().count();
    if !(ORG_NAME_MIN_LEN..=ORG_NAME_MAX_LEN).contains(&len) {
        return Err(DomainError::validation(format!(
            "Organization name must be {}-{} characters",
            ORG_NAME_MIN_LEN, ORG_NAME_MAX_LEN
        )));
    }
    Ok(name.to_string())
}

async fn require_admin_of(
    repo: &dyn TransactionalRepository,
    org_id: &str,
    user_id: &str,
) -> DomainResult<()> {
    match repo.get_membership(org_id, user_id).await? {
        Some(m) if m.is_active() && m.role == Role::Admin => Ok(()),
        _ => Err(DomainError::forbidden(
            "Only admins of this organization can do that",
        )),
    }
}

/// Non-REMOVED member of the organization
async fn require_member(
    repo: &dyn TransactionalRepository,
    org_id: &str,
    user_id: &str,
) -> DomainResult<MemberWithUser> {
    repo.get_member_with_user(org_id, user_id)
        .await?
        .filter(|m| m.status != MemberStatus::Removed)
        .ok_or(DomainError::NotFound("Member"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::org_context::{Identity, OrgContextResolver};

    struct Fixture {
        db: Arc<TransactionalService>,
        resolver: OrgContextResolver,
        service: MembershipService,
    }

    async fn setup(invitations_enabled: bool) -> Fixture {
        let db = Arc::new(TransactionalService::in_memory().await);
        Fixture {
            resolver: OrgContextResolver::new(Arc::clone(&db)),
            service: MembershipService::new(Arc::clone(&db), invitations_enabled),
            db,
        }
    }

    impl Fixture {
        async fn login(&self, email: &str, name: &str) -> (Identity, OrgContext) {
            let user = self
                .db
                .repository()
                .upsert_user(email, Some(name))
                .await
                .unwrap();
            let identity = Identity {
                id: user.id,
                email: email.to_string(),
                name: Some(name.to_string()),
            };
            let ctx = self.resolver.require(Some(&identity)).await.unwrap();
            (identity, ctx)
        }

        /// Invite `email` into `ctx`'s org and let them accept by resolving
        async fn join(&self, ctx: &OrgContext, email: &str, name: &str, role: Role) -> OrgContext {
            let outcome = self
                .service
                .invite(ctx, &ctx.active_org_id, email, role)
                .await
                .unwrap();
            assert!(matches!(outcome, InviteOutcome::Invited(_)));
            self.login(email, name).await.1
        }
    }

    #[tokio::test]
    async fn test_create_org_validates_and_probes_slug() {
        let f = setup(true).await;
        let (ada, _) = f.login("ada@example.com", "Ada").await;

        assert!(matches!(
            f.service.create_org(&ada.id, " x ").await,
            Err(DomainError::Validation(_))
        ));

        let first = f.service.create_org(&ada.id, "Acme Corp").await.unwrap();
        let second = f.service.create_org(&ada.id, "  Acme Corp ").await.unwrap();
        assert_eq!(first.slug, "acme-corp");
        assert_eq!(second.slug, "acme-corp-1");
        assert_eq!(second.name, "Acme Corp");

        let membership = f
            .db
            .repository()
            .get_membership(&second.id, &ada.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(membership.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_rename_and_delete_require_admin_of_target() {
        let f = setup(true).await;
        let (_, ada_ctx) = f.login("ada@example.com", "Ada").await;
        let bob_ctx = f.join(&ada_ctx, "bob@example.com", "Bob", Role::Editor).await;
        let org = ada_ctx.active_org_id.clone();

        assert!(matches!(
            f.service.rename_org(&bob_ctx.user_id, &org, "Renamed").await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.delete_org(&bob_ctx.user_id, &org).await,
            Err(DomainError::Forbidden(_))
        ));

        let renamed = f
            .service
            .rename_org(&ada_ctx.user_id, &org, "Renamed")
            .await
            .unwrap();
        assert_eq!(renamed.name, "Renamed");
    }

    #[tokio::test]
    async fn test_delete_org_returns_next_and_clears_profiles() {
        let f = setup(true).await;
        let (ada, ctx) = f.login("ada@example.com", "Ada").await;
        let second = f.service.create_org(&ada.id, "Second").await.unwrap();

        f.service.switch_org(&ada.id, &second.id).await.unwrap();
        let next = f.service.delete_org(&ada.id, &second.id).await.unwrap();
        assert_eq!(next.as_deref(), Some(ctx.active_org_id.as_str()));

        let profile = f.db.repository().get_profile(&ada.id).await.unwrap().unwrap();
        assert!(profile.last_active_org_id.is_none());

        let ctx = f.resolver.require(Some(&ada)).await.unwrap();
        assert_eq!(ctx.active_org_id, next.unwrap());
    }

    #[tokio::test]
    async fn test_switch_requires_active_membership() {
        let f = setup(true).await;
        let (ada, _) = f.login("ada@example.com", "Ada").await;
        let (_, bob_ctx) = f.login("bob@example.com", "Bob").await;

        assert!(matches!(
            f.service.switch_org(&ada.id, &bob_ctx.active_org_id).await,
            Err(DomainError::Forbidden(_))
        ));

        let second = f.service.create_org(&ada.id, "Second").await.unwrap();
        f.service.switch_org(&ada.id, &second.id).await.unwrap();
        let ctx = f.resolver.require(Some(&ada)).await.unwrap();
        assert_eq!(ctx.active_org_id, second.id);
    }

    #[tokio::test]
    async fn test_last_admin_cannot_be_demoted_or_removed() {
        let f = setup(true).await;
        let (_, ada_ctx) = f.login("ada@example.com", "Ada").await;
        let org = ada_ctx.active_org_id.clone();
        let bob_ctx = f.join(&ada_ctx, "bob@example.com", "Bob", Role::Editor).await;

        assert!(matches!(
            f.service
                .change_role(&ada_ctx, &org, &ada_ctx.user_id, Role::Editor)
                .await,
            Err(DomainError::LastAdmin)
        ));
        assert!(matches!(
            f.service.remove_member(&ada_ctx, &org, &ada_ctx.user_id).await,
            Err(DomainError::LastAdmin)
        ));

        // with a second admin the first may step down
        let bob = f
            .service
            .change_role(&ada_ctx, &org, &bob_ctx.user_id, Role::Admin)
            .await
            .unwrap();
        assert_eq!(bob.role, Role::Admin);
        let ada = f
            .service
            .change_role(&ada_ctx, &org, &ada_ctx.user_id, Role::Viewer)
            .await
            .unwrap();
        assert_eq!(ada.role, Role::Viewer);
        assert_eq!(f.db.repository().count_active_admins(&org).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_member_management_requires_admin_and_active_org() {
        let f = setup(true).await;
        let (_, ada_ctx) = f.login("ada@example.com", "Ada").await;
        let org = ada_ctx.active_org_id.clone();
        let bob_ctx = f.join(&ada_ctx, "bob@example.com", "Bob", Role::Editor).await;

        assert!(matches!(
            f.service.remove_member(&bob_ctx, &org, &ada_ctx.user_id).await,
            Err(DomainError::Forbidden(_))
        ));

        let (_, carol_ctx) = f.login("carol@example.com", "Carol").await;
        assert!(matches!(
            f.service.list_members(&carol_ctx, &org).await,
            Err(DomainError::Forbidden(_))
        ));

        // editors can read the member list
        assert_eq!(f.service.list_members(&bob_ctx, &org).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_removed_member_is_soft_and_not_found_afterwards() {
        let f = setup(true).await;
        let (_, ada_ctx) = f.login("ada@example.com", "Ada").await;
        let org = ada_ctx.active_org_id.clone();
        let bob_ctx = f.join(&ada_ctx, "bob@example.com", "Bob", Role::Viewer).await;

        f.service
            .remove_member(&ada_ctx, &org, &bob_ctx.user_id)
            .await
            .unwrap();

        let row = f
            .db
            .repository()
            .get_membership(&org, &bob_ctx.user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, MemberStatus::Removed);
        assert!(matches!(
            f.service
                .change_role(&ada_ctx, &org, &bob_ctx.user_id, Role::Editor)
                .await,
            Err(DomainError::NotFound("Member"))
        ));
    }

    #[tokio::test]
    async fn test_invite_flow() {
        let f = setup(true).await;
        let (_, ada_ctx) = f.login("ada@example.com", "Ada").await;
        let org = ada_ctx.active_org_id.clone();

        let outcome = f
            .service
            .invite(&ada_ctx, &org, " Bob@Example.com ", Role::Editor)
            .await
            .unwrap();
        let InviteOutcome::Invited(invitation) = outcome else {
            panic!("expected an invitation");
        };
        assert_eq!(invitation.email, "bob@example.com");
        assert_eq!(invitation.token.len(), 64);
        assert!(invitation.expires_at - invitation.created_at > 6 * SECONDS_PER_DAY);

        let listed = f.service.list_invitations(&ada_ctx, &org).await.unwrap();
        assert_eq!(listed.len(), 1);

        let resent = f
            .service
            .resend_invitation(&ada_ctx, &org, &invitation.id)
            .await
            .unwrap();
        assert_eq!(resent.token, invitation.token);
        assert_eq!(resent.expires_at, invitation.expires_at);

        f.service
            .revoke_invitation(&ada_ctx, &org, &invitation.id)
            .await
            .unwrap();
        assert!(matches!(
            f.service.revoke_invitation(&ada_ctx, &org, &invitation.id).await,
            Err(DomainError::NotFound("Invitation"))
        ));
    }

    #[tokio::test]
    async fn test_invite_existing_member_reports_already_member() {
        let f = setup(true).await;
        let (_, ada_ctx) = f.login("ada@example.com", "Ada").await;
        let org = ada_ctx.active_org_id.clone();

        let outcome = f
            .service
            .invite(&ada_ctx, &org, "ADA@example.com", Role::Viewer)
            .await
            .unwrap();
        assert!(matches!(outcome, InviteOutcome::AlreadyMember));
        assert!(f.service.list_invitations(&ada_ctx, &org).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invite_gates() {
        let f = setup(false).await;
        let (_, ada_ctx) = f.login("ada@example.com", "Ada").await;
        let err = f
            .service
            .invite(&ada_ctx, &ada_ctx.active_org_id, "bob@example.com", Role::Viewer)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invitations are disabled");

        let f = setup(true).await;
        let (_, ada_ctx) = f.login("ada@example.com", "Ada").await;
        let (_, bob_ctx) = f.login("bob@example.com", "Bob").await;
        assert!(matches!(
            f.service
                .invite(&ada_ctx, &bob_ctx.active_org_id, "x@example.com", Role::Viewer)
                .await,
            Err(DomainError::Forbidden(_))
        ));
    }
}
