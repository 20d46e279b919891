//! Authentication API endpoints
//!
//! A bootstrap token printed at startup is exchanged for a session cookie.
//! The exchange names the user the session belongs to; unknown emails are
//! created on the fly.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::auth::AuthManager;
use crate::api::extractors::ValidatedJson;
use crate::api::types::{ApiError, timestamp};
use crate::core::constants::{LOCAL_USER_EMAIL, LOCAL_USER_NAME, SESSION_COOKIE_NAME};
use crate::data::TransactionalService;
use crate::data::types::UserRow;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ExchangeRequest {
    #[validate(length(min = 1, message = "Token cannot be empty"))]
    pub token: String,
    /// Account to sign in as; defaults to the local user
    #[validate(email(message = "A valid email address is required"))]
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExchangeResponse {
    pub success: bool,
    pub user: UserDto,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserDto {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

impl From<UserRow> for UserDto {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    pub auth_enabled: bool,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserDto>,
}

#[derive(Clone)]
pub struct AuthRoutesState {
    pub auth_manager: Arc<AuthManager>,
    pub database: Arc<TransactionalService>,
}

pub fn routes(auth_manager: Arc<AuthManager>, database: Arc<TransactionalService>) -> Router {
    Router::new()
        .route("/exchange", post(exchange_token))
        .route("/status", get(auth_status))
        .route("/logout", post(logout))
        .with_state(AuthRoutesState {
            auth_manager,
            database,
        })
}

fn session_cookie(value: String, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, value))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/api")
        .max_age(max_age)
        .build()
}

/// Exchange bootstrap token for a session cookie
#[utoipa::path(
    post,
    path = "/api/auth/exchange",
    tag = "auth",
    request_body = ExchangeRequest,
    responses(
        (status = 200, description = "Session issued", body = ExchangeResponse),
        (status = 401, description = "Invalid bootstrap token")
    )
)]
pub async fn exchange_token(
    State(state): State<AuthRoutesState>,
    jar: CookieJar,
    ValidatedJson(request): ValidatedJson<ExchangeRequest>,
) -> Result<(CookieJar, Json<ExchangeResponse>), ApiError> {
    let auth = &state.auth_manager;
    let method = if auth.is_enabled() {
        if !auth.verify_bootstrap(&request.token) {
            tracing::warn!("Rejected bootstrap token exchange");
            return Err(ApiError::Unauthorized {
                code: "BOOTSTRAP_INVALID".to_string(),
                message: "Invalid bootstrap token".to_string(),
            });
        }
        "bootstrap"
    } else {
        "disabled"
    };

    let (email, name) = match request.email.as_deref() {
        Some(email) => (email, request.name.as_deref()),
        None => (LOCAL_USER_EMAIL, Some(LOCAL_USER_NAME)),
    };
    let user = state
        .database
        .repository()
        .upsert_user(email, name)
        .await
        .map_err(ApiError::from_data)?;

    let jwt = auth.issue_session(&user.id, method).map_err(|e| {
        tracing::error!(error = %e, "Failed to sign session token");
        ApiError::internal("Failed to create session")
    })?;
    tracing::info!(user_id = %user.id, method, "Session issued");

    let max_age = time::Duration::days(i64::from(auth.session_ttl_days()));
    Ok((
        jar.add(session_cookie(jwt, max_age)),
        Json(ExchangeResponse {
            success: true,
            user: user.into(),
        }),
    ))
}

/// Current authentication status
#[utoipa::path(
    get,
    path = "/api/auth/status",
    tag = "auth",
    responses((status = 200, description = "Authentication status", body = AuthStatusResponse))
)]
pub async fn auth_status(
    State(state): State<AuthRoutesState>,
    jar: CookieJar,
) -> Result<Json<AuthStatusResponse>, ApiError> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    let repo = state.database.repository();

    if !state.auth_manager.is_enabled() {
        let user = repo
            .upsert_user(LOCAL_USER_EMAIL, Some(LOCAL_USER_NAME))
            .await
            .map_err(ApiError::from_data)?;
        return Ok(Json(AuthStatusResponse {
            authenticated: true,
            auth_enabled: false,
            version: VERSION,
            auth_method: Some("disabled".to_string()),
            expires_at: None,
            user: Some(user.into()),
        }));
    }

    let anonymous = AuthStatusResponse {
        authenticated: false,
        auth_enabled: true,
        version: VERSION,
        auth_method: None,
        expires_at: None,
        user: None,
    };

    let Some(cookie) = jar.get(SESSION_COOKIE_NAME) else {
        return Ok(Json(anonymous));
    };
    let Ok(claims) = state.auth_manager.validate_session(cookie.value()) else {
        return Ok(Json(anonymous));
    };
    let Some(user) = repo
        .get_user(claims.user_id())
        .await
        .map_err(ApiError::from_data)?
    else {
        return Ok(Json(anonymous));
    };

    Ok(Json(AuthStatusResponse {
        authenticated: true,
        auth_enabled: true,
        version: VERSION,
        auth_method: Some(claims.auth_method),
        expires_at: Some(timestamp(claims.exp)),
        user: Some(user.into()),
    }))
}

/// Clear the session cookie
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses((status = 200, description = "Logged out"))
)]
pub async fn logout(jar: CookieJar) -> (StatusCode, CookieJar, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        jar.remove(session_cookie(String::new(), time::Duration::ZERO)),
        Json(serde_json::json!({ "success": true })),
    )
}
