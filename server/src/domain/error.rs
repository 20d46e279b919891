//! Domain error type shared by organization, resource and simulation services

use thiserror::Error;

use crate::data::DataError;
use crate::data::types::ResourceRef;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("No active organization")]
    OrgRequired,

    #[error("{0}")]
    Forbidden(String),

    #[error("An organization must keep at least one active admin")]
    LastAdmin,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Duplicate(String),

    /// Delete blocked by references from other resources
    #[error("Resource is still referenced")]
    InUse {
        prompts: Vec<ResourceRef>,
        scenarios: Vec<ResourceRef>,
    },

    #[error("{0}")]
    Validation(String),

    /// A request-level precondition with its own error code (e.g. `NO_API_KEY`)
    #[error("{message}")]
    Precondition {
        code: &'static str,
        message: String,
    },

    #[error("Server misconfigured: {0}")]
    Misconfigured(String),

    #[error(transparent)]
    Data(#[from] DataError),
}

impl DomainError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::Duplicate(message.into())
    }

    pub fn precondition(code: &'static str, message: impl Into<String>) -> Self {
        Self::Precondition {
            code,
            message: message.into(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(DomainError::NotFound("Prompt").to_string(), "Prompt not found");
        assert_eq!(
            DomainError::precondition("NO_API_KEY", "No OpenAI key").to_string(),
            "No OpenAI key"
        );
    }

    #[test]
    fn test_data_error_converts() {
        let err: DomainError = DataError::Conflict("slug".into()).into();
        assert!(matches!(err, DomainError::Data(DataError::Conflict(_))));
    }
}
