//! Shared data types for the transactional store

mod enums;
mod resources;
mod transactional;

pub use enums::{InvitationStatus, MemberStatus, PromptStatus, Role, TurnType};

pub use resources::{
    Expectation, NewPrompt, NewScenario, NewTurn, NewVariable, PromptFilter, PromptRow,
    PromptUpdate, ProviderKeyRow, RegexArgs, ResourceRef, ScenarioDetail, ScenarioRow,
    ScenarioSummaryRow, ScenarioUpdate, TextMatchArgs, TurnDetail, VariableRow, VariableUpdate,
};

pub use transactional::{
    InvitationRow, LastAdminResult, MemberWithUser, MembershipRow, NewInvitation, OrgWithRole,
    OrganizationRow, UserProfileRow, UserRow,
};
