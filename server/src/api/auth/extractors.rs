//! Authorization extractors for Axum handlers
//!
//! These combine authentication (from middleware) with tenant resolution and
//! permission checks into a single extraction step.
//!
//! # Usage
//!
//! ```no_run
//! # use promptbench_server::api::auth::WritePrompts;
//! # use promptbench_server::api::types::ApiError;
//! pub async fn create_prompt(auth: WritePrompts) -> Result<(), ApiError> {
//!     // auth.ctx - resolved OrgContext whose role grants write:prompts
//!     Ok(())
//! }
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use crate::api::types::ApiError;
use crate::domain::{Action, Identity, OrgContext, OrgContextResolver, Resource};

// ============================================================================
// Permission Markers
// ============================================================================

/// Marker trait for the action half of a permission
pub trait ActionMarker: Send + Sync + 'static {
    const ACTION: Action;
}

/// Marker trait for the resource half of a permission
pub trait ResourceMarker: Send + Sync + 'static {
    const RESOURCE: Resource;
}

pub mod action {
    use super::{Action, ActionMarker};

    pub struct Read;
    impl ActionMarker for Read {
        const ACTION: Action = Action::Read;
    }

    pub struct Write;
    impl ActionMarker for Write {
        const ACTION: Action = Action::Write;
    }

    pub struct Manage;
    impl ActionMarker for Manage {
        const ACTION: Action = Action::Manage;
    }

    pub struct Settings;
    impl ActionMarker for Settings {
        const ACTION: Action = Action::Settings;
    }
}

pub mod resource {
    use super::{Resource, ResourceMarker};

    pub struct Prompts;
    impl ResourceMarker for Prompts {
        const RESOURCE: Resource = Resource::Prompts;
    }

    pub struct Scenarios;
    impl ResourceMarker for Scenarios {
        const RESOURCE: Resource = Resource::Scenarios;
    }

    pub struct Variables;
    impl ResourceMarker for Variables {
        const RESOURCE: Resource = Resource::Variables;
    }

    pub struct Members;
    impl ResourceMarker for Members {
        const RESOURCE: Resource = Resource::Members;
    }

    pub struct Settings;
    impl ResourceMarker for Settings {
        const RESOURCE: Resource = Resource::Settings;
    }
}

// ============================================================================
// Auth Rejection
// ============================================================================

/// Rejection type for auth extractors
pub enum AuthRejection {
    /// Tenant resolution or permission check failed
    Api(ApiError),
    /// Auth context not available (middleware not applied)
    MissingContext,
}

impl From<ApiError> for AuthRejection {
    fn from(e: ApiError) -> Self {
        Self::Api(e)
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Api(e) => e.into_response(),
            Self::MissingContext => ApiError::internal("Auth context not available").into_response(),
        }
    }
}

fn extract_identity(parts: &Parts) -> Result<Identity, AuthRejection> {
    parts
        .extensions
        .get::<Identity>()
        .cloned()
        .ok_or(AuthRejection::MissingContext)
}

async fn resolve_context(parts: &Parts) -> Result<OrgContext, AuthRejection> {
    let identity = extract_identity(parts)?;
    let resolver = parts
        .extensions
        .get::<Arc<OrgContextResolver>>()
        .cloned()
        .ok_or(AuthRejection::MissingContext)?;
    let ctx = resolver
        .require(Some(&identity))
        .await
        .map_err(ApiError::from)?;
    Ok(ctx)
}

// ============================================================================
// Extractors
// ============================================================================

/// Authenticated caller without tenant resolution
///
/// Use for routes that act on the user rather than the active organization,
/// e.g. listing or switching organizations.
pub struct Auth {
    pub identity: Identity,
}

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            identity: extract_identity(parts)?,
        })
    }
}

/// Resolved organization context, any role
pub struct OrgCtx(pub OrgContext);

impl<S> FromRequestParts<S> for OrgCtx
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve_context(parts).await?))
    }
}

/// Organization context whose role grants `A` on `R`
pub struct Authorized<A: ActionMarker, R: ResourceMarker> {
    pub ctx: OrgContext,
    _permission: PhantomData<(A, R)>,
}

impl<S, A, R> FromRequestParts<S> for Authorized<A, R>
where
    S: Send + Sync,
    A: ActionMarker,
    R: ResourceMarker,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = resolve_context(parts).await?;
        ctx.require(A::ACTION, R::RESOURCE).map_err(ApiError::from)?;
        Ok(Self {
            ctx,
            _permission: PhantomData,
        })
    }
}

pub type ReadPrompts = Authorized<action::Read, resource::Prompts>;
pub type WritePrompts = Authorized<action::Write, resource::Prompts>;
pub type ReadScenarios = Authorized<action::Read, resource::Scenarios>;
pub type WriteScenarios = Authorized<action::Write, resource::Scenarios>;
pub type ReadVariables = Authorized<action::Read, resource::Variables>;
pub type WriteVariables = Authorized<action::Write, resource::Variables>;
pub type ReadMembers = Authorized<action::Read, resource::Members>;
pub type ManageMembers = Authorized<action::Manage, resource::Members>;
pub type ManageSettings = Authorized<action::Settings, resource::Settings>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TransactionalService;
    use crate::data::types::Role;
    use crate::domain::MembershipService;
    use axum::http::{Request, StatusCode};

    async fn parts_for(role: Option<Role>) -> Parts {
        let db = Arc::new(TransactionalService::in_memory().await);
        let resolver = Arc::new(OrgContextResolver::new(db.clone()));
        let repo = db.repository();
        let user = repo.upsert_user("a@example.com", None).await.unwrap();
        if let Some(role) = role {
            let owner = repo.upsert_user("owner@example.com", None).await.unwrap();
            let owner = Identity {
                id: owner.id,
                email: owner.email,
                name: None,
            };
            let owner_ctx = resolver.require(Some(&owner)).await.unwrap();
            let membership = MembershipService::new(db.clone(), true);
            membership
                .invite(&owner_ctx, &owner_ctx.active_org_id, &user.email, role)
                .await
                .unwrap();
        }

        let (mut parts, _) = Request::new(()).into_parts();
        parts.extensions.insert(Identity {
            id: user.id,
            email: user.email,
            name: None,
        });
        parts.extensions.insert(resolver);
        parts
    }

    fn status(rejection: AuthRejection) -> StatusCode {
        rejection.into_response().status()
    }

    #[tokio::test]
    async fn test_missing_middleware() {
        let (mut parts, _) = Request::new(()).into_parts();
        let rejection = OrgCtx::from_request_parts(&mut parts, &()).await.err().unwrap();
        assert_eq!(status(rejection), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_viewer_can_read_but_not_write() {
        let mut parts = parts_for(Some(Role::Viewer)).await;
        assert!(ReadPrompts::from_request_parts(&mut parts, &()).await.is_ok());
        let rejection = WritePrompts::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(status(rejection), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_editor_cannot_manage_settings() {
        let mut parts = parts_for(Some(Role::Editor)).await;
        assert!(WriteScenarios::from_request_parts(&mut parts, &()).await.is_ok());
        assert!(
            ManageSettings::from_request_parts(&mut parts, &())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_first_request_provisions_admin_workspace() {
        let mut parts = parts_for(None).await;
        let OrgCtx(ctx) = OrgCtx::from_request_parts(&mut parts, &()).await.ok().unwrap();
        assert_eq!(ctx.role, Role::Admin);
        assert!(ManageMembers::from_request_parts(&mut parts, &()).await.is_ok());
    }
}
