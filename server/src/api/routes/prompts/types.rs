//! Prompt API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::api::types::{nullable, timestamp};
use crate::data::types::{NewPrompt, PromptFilter, PromptRow, PromptStatus, PromptUpdate};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromptDto {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub content: String,
    pub status: PromptStatus,
    pub created_by_user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PromptRow> for PromptDto {
    fn from(row: PromptRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            content: row.content,
            status: row.status,
            created_by_user_id: row.user_id,
            created_at: timestamp(row.created_at),
            updated_at: timestamp(row.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListPromptsQuery {
    /// Only prompts with this status
    pub status: Option<PromptStatus>,
    /// Case-insensitive substring of the name
    #[validate(length(max = 200, message = "Search text is too long"))]
    pub q: Option<String>,
}

impl From<ListPromptsQuery> for PromptFilter {
    fn from(query: ListPromptsQuery) -> Self {
        Self {
            status: query.status,
            search: query.q.filter(|q| !q.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePromptRequest {
    #[validate(length(min = 1, message = "Prompt name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub content: String,
    /// Defaults to DRAFT
    pub status: Option<PromptStatus>,
}

impl From<CreatePromptRequest> for NewPrompt {
    fn from(body: CreatePromptRequest) -> Self {
        Self {
            name: body.name,
            description: body.description,
            content: body.content,
            status: body.status.unwrap_or(PromptStatus::Draft),
        }
    }
}

/// Partial update; omitted fields are left untouched, `description: null` clears
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePromptRequest {
    #[validate(length(min = 1, message = "Prompt name cannot be empty"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub content: Option<String>,
    pub status: Option<PromptStatus>,
}

impl From<UpdatePromptRequest> for PromptUpdate {
    fn from(body: UpdatePromptRequest) -> Self {
        Self {
            name: body.name,
            description: body.description,
            content: body.content,
            status: body.status,
        }
    }
}
