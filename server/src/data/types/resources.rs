//! Tenant-scoped resource rows (prompts, scenarios, variables, provider keys)

use serde::{Deserialize, Serialize};

use super::enums::{PromptStatus, TurnType};

/// Lightweight reference used in usage reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
    pub name: String,
}

// ============================================================================
// Prompts
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRow {
    pub id: String,
    pub organization_id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub content: String,
    pub status: PromptStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct PromptFilter {
    pub status: Option<PromptStatus>,
    /// Case-insensitive substring match on name
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPrompt {
    pub name: String,
    pub description: Option<String>,
    pub content: String,
    pub status: PromptStatus,
}

/// Partial update; `None` leaves a column untouched
#[derive(Debug, Clone, Default)]
pub struct PromptUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub content: Option<String>,
    pub status: Option<PromptStatus>,
}

// ============================================================================
// Scenarios
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRow {
    pub id: String,
    pub organization_id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub version: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Scenario list entry with turn counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSummaryRow {
    pub scenario: ScenarioRow,
    pub turn_count: i64,
    pub user_turn_count: i64,
}

/// Arguments of MUST_CONTAIN / MUST_NOT_CONTAIN
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMatchArgs {
    pub text: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

/// Arguments of REGEX; `flags` accepts `i`, `m` and `s`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexArgs {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<String>,
}

/// Assertion attached to an EXPECT turn, stored as `(expectation_type, args_json)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "args", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Expectation {
    MustContain(TextMatchArgs),
    MustNotContain(TextMatchArgs),
    Regex(RegexArgs),
}

impl Expectation {
    /// Stored discriminator
    pub fn type_str(&self) -> &'static str {
        match self {
            Self::MustContain(_) => "MUST_CONTAIN",
            Self::MustNotContain(_) => "MUST_NOT_CONTAIN",
            Self::Regex(_) => "REGEX",
        }
    }

    /// Serialized args column
    pub fn args_json(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::MustContain(args) | Self::MustNotContain(args) => serde_json::to_string(args),
            Self::Regex(args) => serde_json::to_string(args),
        }
    }

    /// Rebuild from the stored pair
    pub fn from_stored(expectation_type: &str, args_json: &str) -> Result<Self, serde_json::Error> {
        let args: serde_json::Value = serde_json::from_str(args_json)?;
        serde_json::from_value(serde_json::json!({ "type": expectation_type, "args": args }))
    }
}

/// Turn with its expectations, ordered by `turn_index`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnDetail {
    pub id: String,
    pub turn_index: i64,
    pub turn_type: TurnType,
    pub user_text: Option<String>,
    pub expectations: Vec<Expectation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDetail {
    pub scenario: ScenarioRow,
    pub turns: Vec<TurnDetail>,
}

impl ScenarioDetail {
    /// Text of USER turns in replay order
    pub fn user_turns(&self) -> impl Iterator<Item = &str> {
        self.turns
            .iter()
            .filter(|t| t.turn_type == TurnType::User)
            .map(|t| t.user_text.as_deref().unwrap_or_default())
    }
}

/// Turn to insert; its index is its position in the list
#[derive(Debug, Clone)]
pub struct NewTurn {
    pub turn_type: TurnType,
    pub user_text: Option<String>,
    pub expectations: Vec<Expectation>,
}

impl From<&TurnDetail> for NewTurn {
    fn from(turn: &TurnDetail) -> Self {
        Self {
            turn_type: turn.turn_type,
            user_text: turn.user_text.clone(),
            expectations: turn.expectations.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewScenario {
    pub name: String,
    pub description: Option<String>,
    pub turns: Vec<NewTurn>,
}

/// Partial update; `turns: Some(..)` replaces the whole turn set
#[derive(Debug, Clone, Default)]
pub struct ScenarioUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub turns: Option<Vec<NewTurn>>,
}

// ============================================================================
// Variables
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableRow {
    pub id: String,
    pub organization_id: String,
    pub user_id: String,
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewVariable {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VariableUpdate {
    pub key: Option<String>,
    pub value: Option<String>,
    pub description: Option<Option<String>>,
}

// ============================================================================
// Provider API keys
// ============================================================================

/// Stored provider key; `encrypted_key` never leaves the server
#[derive(Debug, Clone)]
pub struct ProviderKeyRow {
    pub id: String,
    pub organization_id: String,
    pub user_id: String,
    pub provider: String,
    pub encrypted_key: String,
    pub key_hint: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}
