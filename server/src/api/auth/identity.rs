//! Caller identity resolution
//!
//! The middleware asks an [`IdentityResolver`] who is calling. With auth
//! enabled that is the user behind the session cookie; with auth disabled
//! every request runs as the single local user.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum_extra::extract::CookieJar;
use tokio::sync::OnceCell;

use super::jwt::JwtError;
use super::manager::AuthManager;
use super::middleware::AuthError;
use crate::core::constants::{LOCAL_USER_EMAIL, LOCAL_USER_NAME, SESSION_COOKIE_NAME};
use crate::data::TransactionalService;
use crate::data::types::UserRow;
use crate::domain::Identity;

/// Establishes the caller for a request
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// `Ok(None)` when the request carries no credentials
    async fn identify(&self, headers: &HeaderMap) -> Result<Option<Identity>, AuthError>;
}

fn to_identity(user: UserRow) -> Identity {
    Identity {
        id: user.id,
        email: user.email,
        name: user.name,
    }
}

/// Session cookie (JWT) backed identity
pub struct SessionIdentityResolver {
    auth: Arc<AuthManager>,
    database: Arc<TransactionalService>,
}

impl SessionIdentityResolver {
    pub fn new(auth: Arc<AuthManager>, database: Arc<TransactionalService>) -> Self {
        Self { auth, database }
    }
}

#[async_trait]
impl IdentityResolver for SessionIdentityResolver {
    async fn identify(&self, headers: &HeaderMap) -> Result<Option<Identity>, AuthError> {
        let jar = CookieJar::from_headers(headers);
        let Some(cookie) = jar.get(SESSION_COOKIE_NAME) else {
            return Ok(None);
        };

        let claims = self
            .auth
            .validate_session(cookie.value())
            .map_err(|e| match e {
                JwtError::Expired => AuthError::expired(),
                _ => AuthError::invalid(),
            })?;

        let user = self
            .database
            .repository()
            .get_user(claims.user_id())
            .await
            .map_err(AuthError::from_data)?;

        // A valid signature for a user that no longer exists
        match user {
            Some(user) => Ok(Some(to_identity(user))),
            None => Err(AuthError::invalid()),
        }
    }
}

/// Single local user, created on first request
pub struct LocalIdentityResolver {
    database: Arc<TransactionalService>,
    user: OnceCell<Identity>,
}

impl LocalIdentityResolver {
    pub fn new(database: Arc<TransactionalService>) -> Self {
        Self {
            database,
            user: OnceCell::new(),
        }
    }
}

#[async_trait]
impl IdentityResolver for LocalIdentityResolver {
    async fn identify(&self, _headers: &HeaderMap) -> Result<Option<Identity>, AuthError> {
        let identity = self
            .user
            .get_or_try_init(|| async {
                let user = self
                    .database
                    .repository()
                    .upsert_user(LOCAL_USER_EMAIL, Some(LOCAL_USER_NAME))
                    .await
                    .map_err(AuthError::from_data)?;
                tracing::debug!(user_id = %user.id, "Local user ready");
                Ok::<_, AuthError>(to_identity(user))
            })
            .await?;
        Ok(Some(identity.clone()))
    }
}
