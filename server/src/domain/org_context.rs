//! Per-request organization context
//!
//! Every tenant API call resolves the caller's active organization and role
//! here before touching data. Resolution is idempotent and runs on every
//! request, so role or membership changes take effect immediately:
//!
//! 1. Ensure the user's profile row exists
//! 2. Accept pending, unexpired invitations addressed to the user's email
//! 3. Provision a personal workspace when the user belongs to no organization
//! 4. Pick the active organization (last used if still ACTIVE, else the oldest)

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use super::error::{DomainError, DomainResult};
use super::rbac::{Action, Resource, can};
use crate::core::constants::{ORG_NAME_MAX_LEN, ORG_SLUG_MAX_ATTEMPTS, PERSONAL_WORKSPACE_FALLBACK};
use crate::data::types::{MembershipRow, Role};
use crate::data::{DataError, TransactionalRepository, TransactionalService};
use crate::utils::string::{slugify, truncate_chars};

/// Authenticated caller, as established by the identity layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

impl Identity {
    /// Name, else email, else a fixed fallback
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or_else(|| Some(self.email.trim()).filter(|e| !e.is_empty()))
            .unwrap_or(PERSONAL_WORKSPACE_FALLBACK)
    }
}

/// Resolved tenant context for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrgContext {
    pub user_id: String,
    pub active_org_id: String,
    pub role: Role,
    pub is_admin: bool,
    pub is_editor: bool,
    pub is_viewer: bool,
}

impl OrgContext {
    pub fn new(user_id: impl Into<String>, active_org_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            active_org_id: active_org_id.into(),
            role,
            is_admin: role == Role::Admin,
            is_editor: matches!(role, Role::Admin | Role::Editor),
            is_viewer: true,
        }
    }

    pub fn can(&self, action: Action, resource: Resource) -> bool {
        can(Some(self.role), action, resource)
    }

    /// `Forbidden` unless the role grants `action` on `resource`
    pub fn require(&self, action: Action, resource: Resource) -> DomainResult<()> {
        if self.can(action, resource) {
            Ok(())
        } else {
            Err(DomainError::forbidden(format!(
                "Missing permission {}:{}",
                action, resource
            )))
        }
    }

    /// `Forbidden` unless `org_id` is the active organization
    pub fn require_active_org(&self, org_id: &str) -> DomainResult<()> {
        if self.active_org_id == org_id {
            Ok(())
        } else {
            Err(DomainError::forbidden(
                "Organization is not the active organization",
            ))
        }
    }
}

/// Resolves [`OrgContext`] for an identity, provisioning on first use
#[derive(Clone)]
pub struct OrgContextResolver {
    database: Arc<TransactionalService>,
}

impl OrgContextResolver {
    pub fn new(database: Arc<TransactionalService>) -> Self {
        Self { database }
    }

    /// Context for the caller, or `None` without an identity
    pub async fn resolve(&self, identity: Option<&Identity>) -> DomainResult<Option<OrgContext>> {
        let Some(identity) = identity else {
            return Ok(None);
        };
        let repo = self.database.repository();

        let last_active = load_last_active_org(repo.as_ref(), &identity.id).await;

        accept_pending_invitations(repo.as_ref(), identity).await;

        let mut memberships = repo.list_active_memberships(&identity.id).await?;
        if memberships.is_empty() {
            memberships = provision_personal_org(repo.as_ref(), identity).await?;
        }

        let valid_last = last_active
            .as_deref()
            .and_then(|id| memberships.iter().find(|m| m.organization_id == id));

        let membership = match valid_last {
            Some(m) => m,
            None => {
                let Some(first) = memberships.first() else {
                    return Err(DomainError::OrgRequired);
                };
                if let Err(e) = repo
                    .set_last_active_org(&identity.id, Some(&first.organization_id))
                    .await
                {
                    tracing::warn!(user_id = %identity.id, error = %e, "Failed to persist active organization");
                }
                first
            }
        };

        Ok(Some(OrgContext::new(
            &identity.id,
            &membership.organization_id,
            membership.role,
        )))
    }

    /// Like [`resolve`](Self::resolve) but `Unauthorized` without an identity
    pub async fn require(&self, identity: Option<&Identity>) -> DomainResult<OrgContext> {
        self.resolve(identity)
            .await?
            .ok_or(DomainError::Unauthorized)
    }
}

/// Ensure the profile exists and return its last active org (best-effort)
async fn load_last_active_org(repo: &dyn TransactionalRepository, user_id: &str) -> Option<String> {
    if let Err(e) = repo.ensure_profile(user_id).await {
        tracing::warn!(user_id, error = %e, "Failed to ensure user profile");
        return None;
    }
    match repo.get_profile(user_id).await {
        Ok(profile) => profile.and_then(|p| p.last_active_org_id),
        Err(e) => {
            tracing::warn!(user_id, error = %e, "Failed to load user profile");
            None
        }
    }
}

/// Accept every pending, unexpired invitation for the identity's email
///
/// Failures are logged and skipped; a concurrent acceptance makes the
/// repository report `false` and nothing is written twice.
async fn accept_pending_invitations(repo: &dyn TransactionalRepository, identity: &Identity) {
    let email = identity.email.trim().to_lowercase();
    if email.is_empty() {
        return;
    }

    let now = chrono::Utc::now().timestamp();
    let invitations = match repo.list_acceptable_invitations(&email, now).await {
        Ok(list) => list,
        Err(e) => {
            tracing::warn!(user_id = %identity.id, error = %e, "Failed to load pending invitations");
            return;
        }
    };

    for invitation in invitations {
        match repo.accept_invitation(&invitation, &identity.id).await {
            Ok(true) => tracing::info!(
                user_id = %identity.id,
                org_id = %invitation.organization_id,
                role = %invitation.role,
                "Invitation accepted"
            ),
            Ok(false) => tracing::debug!(
                invitation_id = %invitation.id,
                "Invitation already accepted concurrently"
            ),
            Err(e) => tracing::warn!(
                invitation_id = %invitation.id,
                error = %e,
                "Failed to accept invitation"
            ),
        }
    }
}

/// Create "{name}'s Workspace" with the user as ADMIN
///
/// A taken slug moves on to the next `-N` suffix. Before that, memberships
/// are re-read: a slug that exists may belong to a workspace a concurrent
/// request just created for this same user.
async fn provision_personal_org(
    repo: &dyn TransactionalRepository,
    identity: &Identity,
) -> DomainResult<Vec<MembershipRow>> {
    let display = identity.display_name();
    let name = truncate_chars(&format!("{}'s Workspace", display), ORG_NAME_MAX_LEN);
    let base_slug = slugify(display);

    for attempt in 0..ORG_SLUG_MAX_ATTEMPTS {
        let slug = if attempt == 0 {
            base_slug.clone()
        } else {
            format!("{}-{}", base_slug, attempt)
        };

        let taken = repo.slug_exists(&slug).await?;
        if !taken {
            match repo
                .create_organization_with_admin(&name, &slug, &identity.id)
                .await
            {
                Ok(org) => {
                    tracing::info!(
                        user_id = %identity.id,
                        org_id = %org.id,
                        slug = %org.slug,
                        "Personal workspace created"
                    );
                    return Ok(repo.list_active_memberships(&identity.id).await?);
                }
                Err(e) if e.is_conflict() => {
                    tracing::debug!(slug = %slug, "Workspace slug conflict, re-checking memberships");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let memberships = repo.list_active_memberships(&identity.id).await?;
        if !memberships.is_empty() {
            return Ok(memberships);
        }
    }

    Err(DataError::Conflict(format!(
        "no free workspace slug for '{}' after {} attempts",
        base_slug, ORG_SLUG_MAX_ATTEMPTS
    ))
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::NewInvitation;

    async fn setup() -> (Arc<TransactionalService>, OrgContextResolver) {
        let database = Arc::new(TransactionalService::in_memory().await);
        let resolver = OrgContextResolver::new(Arc::clone(&database));
        (database, resolver)
    }

    async fn identity(db: &TransactionalService, email: &str, name: Option<&str>) -> Identity {
        let user = db.repository().upsert_user(email, name).await.unwrap();
        Identity {
            id: user.id,
            email: email.to_string(),
            name: name.map(str::to_string),
        }
    }

    async fn invite(db: &TransactionalService, org_id: &str, inviter: &str, email: &str, expires_at: i64) {
        let token = crate::utils::crypto::generate_token(32);
        db.repository()
            .create_invitation(&NewInvitation {
                organization_id: org_id,
                email,
                role: Role::Editor,
                token: &token,
                expires_at,
                invited_by_user_id: inviter,
            })
            .await
            .unwrap();
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut id = Identity {
            id: "u".into(),
            email: "ada@example.com".into(),
            name: Some("Ada".into()),
        };
        assert_eq!(id.display_name(), "Ada");
        id.name = Some("  ".into());
        assert_eq!(id.display_name(), "ada@example.com");
        id.email = String::new();
        assert_eq!(id.display_name(), "Personal");
    }

    #[test]
    fn test_context_flags_and_gates() {
        let editor = OrgContext::new("u", "o", Role::Editor);
        assert!(!editor.is_admin);
        assert!(editor.is_editor);
        assert!(editor.is_viewer);
        assert!(editor.require(Action::Write, Resource::Prompts).is_ok());
        assert!(matches!(
            editor.require(Action::Manage, Resource::Members),
            Err(DomainError::Forbidden(_))
        ));
        assert!(editor.require_active_org("o").is_ok());
        assert!(editor.require_active_org("other").is_err());
    }

    #[tokio::test]
    async fn test_no_identity() {
        let (_db, resolver) = setup().await;
        assert!(resolver.resolve(None).await.unwrap().is_none());
        assert!(matches!(
            resolver.require(None).await,
            Err(DomainError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_lazy_provisioning_is_idempotent() {
        let (db, resolver) = setup().await;
        let ada = identity(&db, "ada@example.com", Some("Ada")).await;

        let first = resolver.require(Some(&ada)).await.unwrap();
        let second = resolver.require(Some(&ada)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.role, Role::Admin);
        assert!(first.is_admin);

        let orgs = db.repository().list_orgs_for_user(&ada.id).await.unwrap();
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].name, "Ada's Workspace");
        assert_eq!(orgs[0].slug, "ada");

        let profile = db.repository().get_profile(&ada.id).await.unwrap().unwrap();
        assert_eq!(profile.last_active_org_id.as_deref(), Some(first.active_org_id.as_str()));
    }

    #[tokio::test]
    async fn test_concurrent_resolves_create_one_workspace() {
        let (db, resolver) = setup().await;
        let ada = identity(&db, "ada@example.com", Some("Ada")).await;

        let (a, b) = tokio::join!(resolver.require(Some(&ada)), resolver.require(Some(&ada)));
        assert_eq!(a.unwrap().active_org_id, b.unwrap().active_org_id);
        assert_eq!(db.repository().list_orgs_for_user(&ada.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_slug_collision_gets_suffix() {
        let (db, resolver) = setup().await;
        let one = identity(&db, "ada@one.com", Some("Ada")).await;
        let two = identity(&db, "ada@two.com", Some("Ada")).await;

        resolver.require(Some(&one)).await.unwrap();
        let ctx = resolver.require(Some(&two)).await.unwrap();

        let org = db
            .repository()
            .get_organization(&ctx.active_org_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(org.slug, "ada-1");
    }

    #[tokio::test]
    async fn test_long_names_are_truncated() {
        let (db, resolver) = setup().await;
        let long = "x".repeat(100);
        let user = identity(&db, "long@example.com", Some(&long)).await;

        let ctx = resolver.require(Some(&user)).await.unwrap();
        let org = db
            .repository()
            .get_organization(&ctx.active_org_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(org.name.chars().count(), ORG_NAME_MAX_LEN);
    }

    #[tokio::test]
    async fn test_invitation_auto_accept_is_case_insensitive() {
        let (db, resolver) = setup().await;
        let ada = identity(&db, "ada@example.com", Some("Ada")).await;
        let team = resolver.require(Some(&ada)).await.unwrap().active_org_id;

        let far = chrono::Utc::now().timestamp() + 3600;
        invite(&db, &team, &ada.id, "bob@example.com", far).await;

        let bob = identity(&db, "Bob@Example.COM", None).await;
        let ctx = resolver.require(Some(&bob)).await.unwrap();

        // joined the team instead of getting a personal workspace
        assert_eq!(ctx.active_org_id, team);
        assert_eq!(ctx.role, Role::Editor);
        assert_eq!(db.repository().list_orgs_for_user(&bob.id).await.unwrap().len(), 1);
        assert!(db.repository().list_pending_invitations(&team).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_invitation_is_skipped() {
        let (db, resolver) = setup().await;
        let ada = identity(&db, "ada@example.com", Some("Ada")).await;
        let team = resolver.require(Some(&ada)).await.unwrap().active_org_id;

        let past = chrono::Utc::now().timestamp() - 60;
        invite(&db, &team, &ada.id, "bob@example.com", past).await;

        let bob = identity(&db, "bob@example.com", Some("Bob")).await;
        let ctx = resolver.require(Some(&bob)).await.unwrap();

        assert_ne!(ctx.active_org_id, team);
        assert_eq!(ctx.role, Role::Admin);
        assert!(db.repository().get_membership(&team, &bob.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_last_active_org_falls_back() {
        let (db, resolver) = setup().await;
        let ada = identity(&db, "ada@example.com", Some("Ada")).await;
        let bob = identity(&db, "bob@example.com", Some("Bob")).await;

        let own = resolver.require(Some(&ada)).await.unwrap().active_org_id;
        let foreign = resolver.require(Some(&bob)).await.unwrap().active_org_id;

        db.repository()
            .set_last_active_org(&ada.id, Some(&foreign))
            .await
            .unwrap();

        let ctx = resolver.require(Some(&ada)).await.unwrap();
        assert_eq!(ctx.active_org_id, own);
        let profile = db.repository().get_profile(&ada.id).await.unwrap().unwrap();
        assert_eq!(profile.last_active_org_id.as_deref(), Some(own.as_str()));
    }

    #[tokio::test]
    async fn test_role_changes_apply_on_next_resolve() {
        let (db, resolver) = setup().await;
        let ada = identity(&db, "ada@example.com", Some("Ada")).await;
        let team = resolver.require(Some(&ada)).await.unwrap().active_org_id;

        let far = chrono::Utc::now().timestamp() + 3600;
        invite(&db, &team, &ada.id, "bob@example.com", far).await;
        let bob = identity(&db, "bob@example.com", Some("Bob")).await;
        assert_eq!(resolver.require(Some(&bob)).await.unwrap().role, Role::Editor);

        db.repository()
            .update_member_role(&team, &bob.id, Role::Viewer)
            .await
            .unwrap();
        let ctx = resolver.require(Some(&bob)).await.unwrap();
        assert_eq!(ctx.role, Role::Viewer);
        assert!(!ctx.is_editor);
    }
}
