//! Provider API key types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::api::types::timestamp;
use crate::domain::ProviderKeySummary;

/// Stored key metadata; the key itself is never returned
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderKeyDto {
    pub provider: String,
    /// Last characters of the key
    pub key_hint: String,
    pub masked_key: String,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<ProviderKeySummary> for ProviderKeyDto {
    fn from(summary: ProviderKeySummary) -> Self {
        Self {
            provider: summary.provider,
            key_hint: summary.key_hint,
            masked_key: summary.masked_key,
            is_active: summary.is_active,
            updated_at: timestamp(summary.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveProviderKeyRequest {
    #[validate(length(min = 1, message = "Provider is required"))]
    pub provider: String,
    #[validate(length(min = 1, message = "API key is required"))]
    pub api_key: String,
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProviderQuery {
    /// Provider whose key to deactivate, e.g. `openai`
    #[validate(length(min = 1, message = "Provider is required"))]
    pub provider: String,
}
