//! Stored enumerations
//!
//! Each enum is persisted as its upper-case string form and validated by a
//! CHECK constraint in the schema.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Declares a string-backed enum with `as_str`, `parse` and `Display`.
macro_rules! stored_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Parse the stored representation (case-insensitive)
            pub fn parse(s: &str) -> Option<Self> {
                let upper = s.trim().to_ascii_uppercase();
                match upper.as_str() {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

stored_enum! {
    /// Organization role, highest privilege first
    Role {
        Admin => "ADMIN",
        Editor => "EDITOR",
        Viewer => "VIEWER",
    }
}

stored_enum! {
    /// Membership lifecycle; REMOVED rows are kept for audit
    MemberStatus {
        Active => "ACTIVE",
        Invited => "INVITED",
        Removed => "REMOVED",
    }
}

stored_enum! {
    InvitationStatus {
        Pending => "PENDING",
        Accepted => "ACCEPTED",
    }
}

stored_enum! {
    PromptStatus {
        Draft => "DRAFT",
        Published => "PUBLISHED",
        Archived => "ARCHIVED",
    }
}

stored_enum! {
    /// USER turns are replayed against the model; EXPECT turns hold assertions
    TurnType {
        User => "USER",
        Expect => "EXPECT",
    }
}
