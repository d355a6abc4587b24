//! Typed identifiers for tracker objects and runs.
//!
//! Issue keys, project keys, transition ids and user names are all plain
//! strings on the wire; wrapping each one keeps an [`IssueKey`] from being
//! passed where a [`TransitionId`] is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// string_id!: trimmed, non-empty string newtype with as_str() and Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty
            /// or only whitespace. Surrounding whitespace is trimmed.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                let trimmed = v.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(Self(trimmed.to_string()))
                }
            }

            /// The identifier text.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Run identity
// ---------------------------------------------------------------------------

/// Identifies a single submission run (one CLI invocation).
///
/// Attached to the root tracing span so all activity from a run can be
/// correlated in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers — tracker-assigned
// ---------------------------------------------------------------------------

string_id! {
    /// A tracker issue key in `PROJECT-NUMBER` form (e.g. `"BM-5610"`).
    ///
    /// Used for parent issues and for the sub-tasks created beneath them.
    IssueKey
}

string_id! {
    /// A tracker project key (e.g. `"BM"`).
    ProjectKey
}

string_id! {
    /// Identifies a workflow transition offered for a specific issue.
    ///
    /// Transition ids are only meaningful for the issue they were listed for.
    TransitionId
}

// ---------------------------------------------------------------------------
// Identifiers — configuration-supplied names
// ---------------------------------------------------------------------------

string_id! {
    /// The tracker user name every created sub-task is assigned to.
    AssigneeName
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_id_rejects_blank() {
        assert!(IssueKey::new("").is_none());
        assert!(IssueKey::new("   ").is_none());
    }

    #[test]
    fn test_string_id_trims() {
        let key = IssueKey::new(" BM-5610\n").unwrap();
        assert_eq!(key.as_str(), "BM-5610");
        assert_eq!(key.to_string(), "BM-5610");
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(RunId::new_random(), RunId::new_random());
    }
}
