//! Variable API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::types::{nullable, timestamp};
use crate::data::types::{NewVariable, VariableRow, VariableUpdate};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VariableDto {
    pub id: String,
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<VariableRow> for VariableDto {
    fn from(row: VariableRow) -> Self {
        Self {
            id: row.id,
            key: row.key,
            value: row.value,
            description: row.description,
            created_at: timestamp(row.created_at),
            updated_at: timestamp(row.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateVariableRequest {
    #[validate(length(min = 1, message = "Variable key is required"))]
    pub key: String,
    #[serde(default)]
    pub value: String,
    pub description: Option<String>,
}

impl From<CreateVariableRequest> for NewVariable {
    fn from(body: CreateVariableRequest) -> Self {
        Self {
            key: body.key,
            value: body.value,
            description: body.description,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateVariableRequest {
    #[validate(length(min = 1, message = "Variable key cannot be empty"))]
    pub key: Option<String>,
    pub value: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
}

impl From<UpdateVariableRequest> for VariableUpdate {
    fn from(body: UpdateVariableRequest) -> Self {
        Self {
            key: body.key,
            value: body.value,
            description: body.description,
        }
    }
}
