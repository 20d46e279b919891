//! Scenario API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::types::{nullable, timestamp};
use crate::data::types::{
    Expectation, NewScenario, NewTurn, ScenarioDetail, ScenarioRow, ScenarioSummaryRow,
    ScenarioUpdate, TurnDetail, TurnType,
};

/// Scenario list entry
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummaryDto {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub version: i64,
    pub turn_count: i64,
    pub user_turn_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ScenarioSummaryRow> for ScenarioSummaryDto {
    fn from(row: ScenarioSummaryRow) -> Self {
        let ScenarioRow {
            id,
            name,
            description,
            version,
            created_at,
            updated_at,
            ..
        } = row.scenario;
        Self {
            id,
            name,
            description,
            version,
            turn_count: row.turn_count,
            user_turn_count: row.user_turn_count,
            created_at: timestamp(created_at),
            updated_at: timestamp(updated_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TurnDto {
    pub id: String,
    pub turn_index: i64,
    pub turn_type: TurnType,
    pub user_text: Option<String>,
    /// `{"type": "MUST_CONTAIN" | "MUST_NOT_CONTAIN" | "REGEX", "args": {...}}`
    #[schema(value_type = Vec<Object>)]
    pub expectations: Vec<Expectation>,
}

impl From<TurnDetail> for TurnDto {
    fn from(turn: TurnDetail) -> Self {
        Self {
            id: turn.id,
            turn_index: turn.turn_index,
            turn_type: turn.turn_type,
            user_text: turn.user_text,
            expectations: turn.expectations,
        }
    }
}

/// Scenario with its ordered turns
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDto {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub version: i64,
    pub created_by_user_id: String,
    pub turns: Vec<TurnDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ScenarioDetail> for ScenarioDto {
    fn from(detail: ScenarioDetail) -> Self {
        let scenario = detail.scenario;
        Self {
            id: scenario.id,
            name: scenario.name,
            description: scenario.description,
            version: scenario.version,
            created_by_user_id: scenario.user_id,
            turns: detail.turns.into_iter().map(TurnDto::from).collect(),
            created_at: timestamp(scenario.created_at),
            updated_at: timestamp(scenario.updated_at),
        }
    }
}

/// Turn to store; its position in the list is its index
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TurnInput {
    pub turn_type: TurnType,
    pub user_text: Option<String>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub expectations: Vec<Expectation>,
}

impl From<TurnInput> for NewTurn {
    fn from(input: TurnInput) -> Self {
        Self {
            turn_type: input.turn_type,
            user_text: input.user_text,
            expectations: input.expectations,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateScenarioRequest {
    #[validate(length(min = 1, message = "Scenario name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub turns: Vec<TurnInput>,
}

impl From<CreateScenarioRequest> for NewScenario {
    fn from(body: CreateScenarioRequest) -> Self {
        Self {
            name: body.name,
            description: body.description,
            turns: body.turns.into_iter().map(NewTurn::from).collect(),
        }
    }
}

/// Partial update; `turns` replaces the whole turn set
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateScenarioRequest {
    #[validate(length(min = 1, message = "Scenario name cannot be empty"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub turns: Option<Vec<TurnInput>>,
}

impl From<UpdateScenarioRequest> for ScenarioUpdate {
    fn from(body: UpdateScenarioRequest) -> Self {
        Self {
            name: body.name,
            description: body.description,
            turns: body
                .turns
                .map(|turns| turns.into_iter().map(NewTurn::from).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::TextMatchArgs;

    #[test]
    fn test_turn_input_parses_tagged_expectations() {
        let input: TurnInput = serde_json::from_str(
            r#"{"turnType":"EXPECT","expectations":[
                {"type":"MUST_CONTAIN","args":{"text":"hello","caseSensitive":true}},
                {"type":"REGEX","args":{"pattern":"^h","flags":"i"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(input.turn_type, TurnType::Expect);
        assert_eq!(
            input.expectations[0],
            Expectation::MustContain(TextMatchArgs {
                text: "hello".into(),
                case_sensitive: true,
            })
        );
        assert_eq!(input.expectations[1].type_str(), "REGEX");
    }

    #[test]
    fn test_update_distinguishes_cleared_description() {
        let body: UpdateScenarioRequest =
            serde_json::from_str(r#"{"description":null}"#).unwrap();
        let update = ScenarioUpdate::from(body);
        assert_eq!(update.description, Some(None));
        assert!(update.turns.is_none());
    }
}
