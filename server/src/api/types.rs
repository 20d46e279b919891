//! Shared API types
//!
//! Error responses share one JSON shape across all endpoints:
//!
//! ```json
//! { "error": "bad_request", "code": "IN_USE", "message": "...", "details": { ... } }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::DomainError;

/// Unix seconds to a UTC timestamp for JSON responses
pub fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`)
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Strips surrounding whitespace before validators see the value
pub fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

/// Acknowledgement body for mutations without a resource to return
#[derive(Debug, Serialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

/// `{"ok": true}`
pub fn ok() -> Json<OkResponse> {
    Json(OkResponse { ok: true })
}

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest {
        code: String,
        message: String,
        details: Option<Value>,
    },
    Unauthorized { code: String, message: String },
    Forbidden { code: String, message: String },
    NotFound { code: String, message: String },
    ServiceUnavailable { message: String },
    Internal { code: String, message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: impl Into<String>, message: impl Into<String>, details: Value) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn forbidden(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Forbidden {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: "INTERNAL".to_string(),
            message: message.into(),
        }
    }

    pub fn from_data(e: crate::data::DataError) -> Self {
        if e.is_transient() {
            tracing::warn!(error = %e, "Database unavailable");
            return Self::ServiceUnavailable {
                message: "Database unavailable".to_string(),
            };
        }
        tracing::error!(error = %e, "Data error");
        Self::internal("Database operation failed")
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Unauthorized => Self::Unauthorized {
                code: "UNAUTHORIZED".to_string(),
                message: e.to_string(),
            },
            DomainError::OrgRequired => Self::forbidden("ORG_REQUIRED", e.to_string()),
            DomainError::Forbidden(message) => Self::forbidden("FORBIDDEN", message),
            DomainError::LastAdmin => Self::forbidden("LAST_ADMIN", e.to_string()),
            DomainError::NotFound(_) => Self::not_found("NOT_FOUND", e.to_string()),
            DomainError::Duplicate(message) => Self::bad_request("DUPLICATE", message),
            DomainError::InUse {
                ref prompts,
                ref scenarios,
            } => Self::with_details(
                "IN_USE",
                e.to_string(),
                serde_json::json!({ "prompts": prompts, "scenarios": scenarios }),
            ),
            DomainError::Validation(message) => Self::bad_request("VALIDATION", message),
            DomainError::Precondition { code, message } => Self::bad_request(code, message),
            DomainError::Misconfigured(detail) => {
                tracing::error!(detail = %detail, "Server misconfigured");
                Self::Internal {
                    code: "SERVER_MISCONFIGURED".to_string(),
                    message: "Server misconfigured".to_string(),
                }
            }
            DomainError::Data(e) => Self::from_data(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message, details) = match self {
            Self::BadRequest {
                code,
                message,
                details,
            } => (StatusCode::BAD_REQUEST, "bad_request", code, message, details),
            Self::Unauthorized { code, message } => {
                (StatusCode::UNAUTHORIZED, "unauthorized", code, message, None)
            }
            Self::Forbidden { code, message } => {
                (StatusCode::FORBIDDEN, "forbidden", code, message, None)
            }
            Self::NotFound { code, message } => {
                (StatusCode::NOT_FOUND, "not_found", code, message, None)
            }
            Self::ServiceUnavailable { message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                "SERVICE_UNAVAILABLE".to_string(),
                message,
                None,
            ),
            Self::Internal { code, message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                code,
                message,
                None,
            ),
        };

        let mut body = serde_json::json!({
            "error": error_type,
            "code": code,
            "message": message,
        });
        if let (Some(details), Some(obj)) = (details, body.as_object_mut()) {
            obj.insert("details".to_string(), details);
        }
        (status, Json(body)).into_response()
    }
}
