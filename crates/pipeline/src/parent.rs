//! Parent issue selection by file-name convention.
//!
//! Files whose name mentions `maintenance` go under the maintenance parent,
//! files mentioning `develop` under the develop parent. Anything else falls
//! back to the maintenance parent.

use crate::IssueKey;

/// The two configured parent issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentKeys {
    /// Parent for maintenance work; also the fallback.
    pub maintenance: IssueKey,
    /// Parent for development work.
    pub develop: IssueKey,
}

/// Which rule picked the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRule {
    /// The file name contains `maintenance`.
    Maintenance,
    /// The file name contains `develop` (and not `maintenance`).
    Develop,
    /// Neither keyword matched; the maintenance parent was used.
    Fallback,
}

/// Parent issue chosen for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentSelection {
    /// Issue every sub-task of the run is created under.
    pub key: IssueKey,
    /// Rule that selected [`ParentSelection::key`].
    pub rule: ParentRule,
}

/// Selects the parent issue for `file_name`.
///
/// Matching is a case-insensitive substring test; `maintenance` is checked
/// before `develop`.
pub fn resolve_parent(file_name: &str, parents: &ParentKeys) -> ParentSelection {
    let lowered = file_name.to_lowercase();
    let (key, rule) = if lowered.contains("maintenance") {
        (&parents.maintenance, ParentRule::Maintenance)
    } else if lowered.contains("develop") {
        (&parents.develop, ParentRule::Develop)
    } else {
        (&parents.maintenance, ParentRule::Fallback)
    };
    ParentSelection {
        key: key.clone(),
        rule,
    }
}
