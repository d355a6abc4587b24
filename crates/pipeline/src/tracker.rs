//! The issue-tracker port.
//!
//! [`IssueTracker`] is the only way the orchestration layer reaches the remote
//! tracker. Infrastructure crates implement it over HTTP; tests implement it
//! in memory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{AssigneeName, IssueKey, ProjectKey, SubmitError, TransitionId, WorkDuration};

/// Name of the status every sub-task is moved into.
pub const DONE_STATUS: &str = "Done";

/// Issue type name used when the project does not list a sub-task type.
pub const DEFAULT_SUBTASK_TYPE: &str = "Sub-task";

// ---------------------------------------------------------------------------
// Tracker entities
// ---------------------------------------------------------------------------

/// The account the credentials belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerUser {
    /// Login name.
    pub name: Option<String>,
    /// Human-readable name.
    pub display_name: String,
    /// Email address, when visible to the caller.
    pub email: Option<String>,
}

/// A component or issue type as listed on a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntity {
    /// Tracker-assigned id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// `true` for issue types that require a parent. Always `false` for
    /// components.
    pub subtask: bool,
}

/// Project details needed to build sub-task payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Tracker-assigned project id.
    pub id: String,
    /// Project key.
    pub key: ProjectKey,
    /// Components defined on the project.
    pub components: Vec<NamedEntity>,
    /// Issue types available in the project.
    pub issue_types: Vec<NamedEntity>,
}

impl ProjectMetadata {
    /// Returns the id of the component called `name`.
    pub fn component_id(&self, name: &str) -> Option<&str> {
        self.components
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id.as_str())
    }

    /// Returns the id of the sub-task issue type, preferring one named
    /// [`DEFAULT_SUBTASK_TYPE`] over any other type flagged as a sub-task.
    pub fn subtask_type_id(&self) -> Option<&str> {
        self.issue_types
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(DEFAULT_SUBTASK_TYPE))
            .or_else(|| self.issue_types.iter().find(|t| t.subtask))
            .map(|t| t.id.as_str())
    }
}

/// A workflow transition offered for an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Id to post back when executing the transition.
    pub id: TransitionId,
    /// Transition (button) name, e.g. `"Resolve Issue"`.
    pub name: String,
    /// Name of the status the transition leads to, when reported.
    pub target_status: Option<String>,
}

/// Picks the transition into the `Done` status.
///
/// A transition matches when its target status is `Done` (ignoring case).
/// Trackers that omit the target status are matched on the transition name
/// instead, accepting `Done`, `Complete`, and `Closed`.
pub fn select_done_transition(transitions: &[Transition]) -> Option<&Transition> {
    transitions
        .iter()
        .find(|t| {
            t.target_status
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(DONE_STATUS))
        })
        .or_else(|| {
            transitions.iter().find(|t| {
                t.target_status.is_none()
                    && ["done", "complete", "closed"]
                        .iter()
                        .any(|n| t.name.eq_ignore_ascii_case(n))
            })
        })
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// How to reference something in a create payload: by id when the project
/// metadata provided one, otherwise by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    /// Reference by tracker id.
    Id(String),
    /// Reference by display name.
    Name(String),
}

/// Payload for creating one sub-task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubtask {
    /// Project the sub-task lives in.
    pub project: EntityRef,
    /// Parent issue.
    pub parent: IssueKey,
    /// Sub-task issue type.
    pub issue_type: EntityRef,
    /// Summary line.
    pub summary: String,
    /// Assignee user name.
    pub assignee: AssigneeName,
    /// Labels, set verbatim.
    pub labels: Vec<String>,
    /// Components, set verbatim.
    pub components: Vec<EntityRef>,
    /// Original estimate, sent verbatim.
    pub original_estimate: WorkDuration,
}

/// Payload for logging work on an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorklogEntry {
    /// Time spent, sent verbatim.
    pub time_spent: WorkDuration,
    /// Start of the work, already rendered in the tracker's timestamp format.
    pub started: String,
    /// Free-text comment.
    pub comment: String,
}

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// Operations the submission run needs from an issue tracker.
///
/// Every method is a single request/response exchange except
/// [`IssueTracker::transition_to_done`], which lists transitions and then
/// executes the selected one. Implementations must not retry.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Returns the account the credentials authenticate as.
    async fn current_user(&self) -> Result<TrackerUser, SubmitError>;

    /// Returns the project's id, components, and issue types.
    async fn project(&self, key: &ProjectKey) -> Result<ProjectMetadata, SubmitError>;

    /// Creates a sub-task and returns its key.
    async fn create_subtask(&self, subtask: &NewSubtask) -> Result<IssueKey, SubmitError>;

    /// Adds a worklog entry to `issue`.
    async fn log_work(&self, issue: &IssueKey, entry: &WorklogEntry) -> Result<(), SubmitError>;

    /// Lists the transitions currently available for `issue`.
    async fn transitions(&self, issue: &IssueKey) -> Result<Vec<Transition>, SubmitError>;

    /// Executes transition `id` on `issue`.
    async fn execute_transition(
        &self,
        issue: &IssueKey,
        id: &TransitionId,
    ) -> Result<(), SubmitError>;

    /// Moves `issue` into the `Done` status and returns the transition used.
    ///
    /// Fails with [`SubmitError::TransitionUnavailable`] when the workflow
    /// offers no transition into `Done`.
    async fn transition_to_done(&self, issue: &IssueKey) -> Result<Transition, SubmitError> {
        let available = self.transitions(issue).await?;
        let Some(done) = select_done_transition(&available).cloned() else {
            return Err(SubmitError::TransitionUnavailable {
                issue: issue.clone(),
                available: available.into_iter().map(|t| t.name).collect(),
            });
        };
        self.execute_transition(issue, &done.id).await?;
        Ok(done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(id: &str, name: &str, to: Option<&str>) -> Transition {
        Transition {
            id: TransitionId::new(id).unwrap(),
            name: name.to_string(),
            target_status: to.map(str::to_string),
        }
    }

    #[test]
    fn test_selects_by_target_status_ignoring_case() {
        let transitions = vec![
            transition("11", "Start Progress", Some("In Progress")),
            transition("31", "Resolve", Some("DONE")),
        ];
        assert_eq!(
            select_done_transition(&transitions).map(|t| t.id.as_str()),
            Some("31")
        );
    }

    #[test]
    fn test_target_status_beats_name() {
        let transitions = vec![
            transition("21", "Done", Some("Archived")),
            transition("31", "Finish", Some("Done")),
        ];
        assert_eq!(
            select_done_transition(&transitions).map(|t| t.id.as_str()),
            Some("31")
        );
    }

    #[test]
    fn test_falls_back_to_name_without_target() {
        let transitions = vec![transition("41", "Closed", None)];
        assert_eq!(
            select_done_transition(&transitions).map(|t| t.id.as_str()),
            Some("41")
        );
    }

    #[test]
    fn test_no_match() {
        let transitions = vec![
            transition("11", "Start Progress", Some("In Progress")),
            transition("21", "Done", Some("Archived")),
        ];
        assert!(select_done_transition(&transitions).is_none());
        assert!(select_done_transition(&[]).is_none());
    }

    #[test]
    fn test_project_metadata_lookup() {
        let project = ProjectMetadata {
            id: "10000".into(),
            key: ProjectKey::new("BM").unwrap(),
            components: vec![NamedEntity {
                id: "200".into(),
                name: "DevOps".into(),
                subtask: false,
            }],
            issue_types: vec![
                NamedEntity {
                    id: "1".into(),
                    name: "Task".into(),
                    subtask: false,
                },
                NamedEntity {
                    id: "7".into(),
                    name: "Technical sub-task".into(),
                    subtask: true,
                },
                NamedEntity {
                    id: "5".into(),
                    name: "Sub-task".into(),
                    subtask: true,
                },
            ],
        };
        assert_eq!(project.component_id("DevOps"), Some("200"));
        assert_eq!(project.component_id("QA"), None);
        assert_eq!(project.subtask_type_id(), Some("5"));
    }
}
