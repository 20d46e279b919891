//! Authentication and authorization
//!
//! - `jwt` / `manager` - session tokens and bootstrap exchange
//! - `identity` - who is calling (session cookie or the local user)
//! - `middleware` - injects the caller into request extensions
//! - `extractors` - org context and permission checks for handlers

mod extractors;
mod identity;
pub mod jwt;
mod manager;
pub mod middleware;

pub use extractors::{
    ActionMarker, Auth, AuthRejection, Authorized, ManageMembers, ManageSettings, OrgCtx,
    ReadMembers, ReadPrompts, ReadScenarios, ReadVariables, ResourceMarker, WritePrompts,
    WriteScenarios, WriteVariables, action, resource,
};
pub use identity::{IdentityResolver, LocalIdentityResolver, SessionIdentityResolver};
pub use jwt::SessionClaims;
pub use manager::AuthManager;
pub use middleware::{AuthError, AuthState, require_auth};
