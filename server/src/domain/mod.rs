//! Domain logic for multi-tenant prompt testing
//!
//! - `org_context` - caller identity to active organization resolution
//! - `membership` - organizations, members and invitations
//! - `prompts`, `scenarios`, `variables`, `provider_keys` - tenant resources
//! - `simulation` - side-by-side prompt replay against an LLM
//! - `rbac` - role to permission mapping

pub mod error;
pub mod membership;
pub mod naming;
pub mod org_context;
pub mod prompts;
pub mod provider_keys;
pub mod rbac;
pub mod scenarios;
pub mod simulation;
pub mod variables;

pub use error::{DomainError, DomainResult};
pub use membership::{InviteOutcome, MembershipService};
pub use org_context::{Identity, OrgContext, OrgContextResolver};
pub use prompts::PromptService;
pub use provider_keys::{ProviderKeyService, ProviderKeySummary};
pub use rbac::{Action, Resource};
pub use scenarios::ScenarioService;
pub use simulation::{SimulationEvent, SimulationRequest, SimulationService};
pub use variables::VariableService;
