//! Authentication middleware

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use super::identity::IdentityResolver;
use crate::api::middleware::AllowedOrigins;
use crate::data::DataError;
use crate::domain::OrgContextResolver;

/// Authentication error response
#[derive(Debug)]
pub struct AuthError {
    pub status: StatusCode,
    pub error: &'static str,
    pub code: &'static str,
    pub message: String,
}

impl AuthError {
    pub fn required() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "unauthorized",
            code: "AUTH_REQUIRED",
            message: "Authentication required".to_string(),
        }
    }

    pub fn expired() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "unauthorized",
            code: "TOKEN_EXPIRED",
            message: "Session has expired".to_string(),
        }
    }

    pub fn invalid() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "unauthorized",
            code: "TOKEN_INVALID",
            message: "Invalid session token".to_string(),
        }
    }

    pub fn origin_not_allowed() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "unauthorized",
            code: "ORIGIN_NOT_ALLOWED",
            message: "Request origin not allowed".to_string(),
        }
    }

    pub fn from_data(e: DataError) -> Self {
        if e.is_transient() {
            tracing::warn!(error = %e, "Database unavailable during authentication");
            return Self {
                status: StatusCode::SERVICE_UNAVAILABLE,
                error: "service_unavailable",
                code: "SERVICE_UNAVAILABLE",
                message: "Database unavailable".to_string(),
            };
        }
        tracing::error!(error = %e, "Failed to resolve identity");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: "internal_error",
            code: "INTERNAL",
            message: "Failed to resolve identity".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.error,
            "code": self.code,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

/// Shared auth state for middleware
#[derive(Clone)]
pub struct AuthState {
    pub identity: Arc<dyn IdentityResolver>,
    pub org_context: Arc<OrgContextResolver>,
    pub allowed_origins: AllowedOrigins,
    /// Reject cross-origin browser requests (session auth only)
    pub check_origin: bool,
}

/// Origin header, else the origin part of Referer
fn request_origin(headers: &HeaderMap) -> Option<String> {
    if let Some(origin) = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
        return Some(origin.to_string());
    }
    let referer = headers.get(header::REFERER)?.to_str().ok()?;
    match reqwest::Url::parse(referer) {
        Ok(u) => {
            let host = u.host_str()?;
            Some(match u.port() {
                Some(port) => format!("{}://{}:{}", u.scheme(), host, port),
                None => format!("{}://{}", u.scheme(), host),
            })
        }
        Err(_) => {
            tracing::debug!(referer = %referer, "Failed to parse Referer URL");
            None
        }
    }
}

/// Authentication middleware
///
/// Injects into request extensions:
/// - `Identity` - the caller
/// - `Arc<OrgContextResolver>` - used by the org-scoped extractors
pub async fn require_auth(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if state.check_origin
        && let Some(origin) = request_origin(request.headers())
        && !state.allowed_origins.is_allowed(&origin)
    {
        tracing::warn!("Rejected request from disallowed origin: {}", origin);
        return Err(AuthError::origin_not_allowed());
    }

    let identity = state
        .identity
        .identify(request.headers())
        .await?
        .ok_or_else(AuthError::required)?;

    request.extensions_mut().insert(identity);
    request
        .extensions_mut()
        .insert(Arc::clone(&state.org_context));

    Ok(next.run(request).await)
}
