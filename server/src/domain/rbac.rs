//! Role-based access control
//!
//! A single pure policy over `(role, action, resource)`. Handlers call it
//! through the `Authorized<A, R>` extractor or directly via [`can`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Write,
    Manage,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Scenarios,
    Prompts,
    Variables,
    Members,
    Settings,
    Orgs,
}

impl Action {
    pub const ALL: [Action; 4] = [Self::Read, Self::Write, Self::Manage, Self::Settings];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Manage => "manage",
            Self::Settings => "settings",
        }
    }
}

impl Resource {
    pub const ALL: [Resource; 6] = [
        Self::Scenarios,
        Self::Prompts,
        Self::Variables,
        Self::Members,
        Self::Settings,
        Self::Orgs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scenarios => "scenarios",
            Self::Prompts => "prompts",
            Self::Variables => "variables",
            Self::Members => "members",
            Self::Settings => "settings",
            Self::Orgs => "orgs",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `role` may perform `action` on `resource`
///
/// No role denies everything. ADMIN may do anything. EDITOR may read and
/// write content but never touch settings or members. VIEWER may only read.
pub fn can(role: Option<Role>, action: Action, resource: Resource) -> bool {
    match role {
        None => false,
        Some(Role::Admin) => true,
        Some(Role::Editor) => {
            let settings = resource == Resource::Settings || action == Action::Settings;
            let members = resource == Resource::Members || action == Action::Manage;
            !settings && !members
        }
        Some(Role::Viewer) => action == Action::Read,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_examples() {
        assert!(can(Some(Role::Editor), Action::Write, Resource::Scenarios));
        assert!(!can(Some(Role::Editor), Action::Manage, Resource::Members));
        assert!(!can(Some(Role::Viewer), Action::Write, Resource::Prompts));
        assert!(can(Some(Role::Viewer), Action::Read, Resource::Members));
        assert!(!can(Some(Role::Editor), Action::Read, Resource::Settings));
    }

    #[test]
    fn test_full_grid() {
        for action in Action::ALL {
            for resource in Resource::ALL {
                assert!(!can(None, action, resource), "none {action}:{resource}");
                assert!(can(Some(Role::Admin), action, resource));
                assert_eq!(
                    can(Some(Role::Viewer), action, resource),
                    action == Action::Read,
                    "viewer {action}:{resource}"
                );

                let editor_expected = matches!(action, Action::Read | Action::Write)
                    && !matches!(resource, Resource::Settings | Resource::Members);
                assert_eq!(
                    can(Some(Role::Editor), action, resource),
                    editor_expected,
                    "editor {action}:{resource}"
                );
            }
        }
    }

    #[test]
    fn test_unknown_role_string_denies() {
        let role = Role::parse("OWNER");
        assert!(role.is_none());
        assert!(!can(role, Action::Read, Resource::Prompts));
    }
}
