//! Jira REST v2 wire types.
//!
//! Request bodies borrow from the domain payloads; response bodies keep only
//! the fields the submission run reads.

use pipeline::{
    EntityRef, NamedEntity, NewSubtask, ProjectKey, ProjectMetadata, TrackerUser, Transition,
    TransitionId, WorklogEntry,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// `{"id": ...}` or `{"name": ...}`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum Reference<'a> {
    Id { id: &'a str },
    Name { name: &'a str },
}

impl<'a> From<&'a EntityRef> for Reference<'a> {
    fn from(value: &'a EntityRef) -> Self {
        match value {
            EntityRef::Id(id) => Self::Id { id },
            EntityRef::Name(name) => Self::Name { name },
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct KeyReference<'a> {
    pub key: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct NameReference<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TimeTracking<'a> {
    pub original_estimate: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubtaskFields<'a> {
    pub project: Reference<'a>,
    pub parent: KeyReference<'a>,
    pub issuetype: Reference<'a>,
    pub summary: &'a str,
    pub assignee: NameReference<'a>,
    pub labels: &'a [String],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Reference<'a>>,
    pub timetracking: TimeTracking<'a>,
}

/// Body of `POST /issue`.
#[derive(Debug, Serialize)]
pub(crate) struct CreateIssueRequest<'a> {
    pub fields: SubtaskFields<'a>,
}

impl<'a> From<&'a NewSubtask> for CreateIssueRequest<'a> {
    fn from(subtask: &'a NewSubtask) -> Self {
        Self {
            fields: SubtaskFields {
                project: (&subtask.project).into(),
                parent: KeyReference {
                    key: subtask.parent.as_str(),
                },
                issuetype: (&subtask.issue_type).into(),
                summary: &subtask.summary,
                assignee: NameReference {
                    name: subtask.assignee.as_str(),
                },
                labels: &subtask.labels,
                components: subtask.components.iter().map(Reference::from).collect(),
                timetracking: TimeTracking {
                    original_estimate: subtask.original_estimate.as_str(),
                },
            },
        }
    }
}

/// Body of `POST /issue/{key}/worklog`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WorklogRequest<'a> {
    pub time_spent: &'a str,
    pub started: &'a str,
    pub comment: &'a str,
}

impl<'a> From<&'a WorklogEntry> for WorklogRequest<'a> {
    fn from(entry: &'a WorklogEntry) -> Self {
        Self {
            time_spent: entry.time_spent.as_str(),
            started: &entry.started,
            comment: &entry.comment,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TransitionReference<'a> {
    pub id: &'a str,
}

/// Body of `POST /issue/{key}/transitions`.
#[derive(Debug, Serialize)]
pub(crate) struct TransitionRequest<'a> {
    pub transition: TransitionReference<'a>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Response of `POST /issue`.
#[derive(Debug, Deserialize)]
pub(crate) struct CreatedIssue {
    pub key: String,
}

/// Response of `GET /myself`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Myself {
    pub name: Option<String>,
    pub display_name: String,
    pub email_address: Option<String>,
}

impl From<Myself> for TrackerUser {
    fn from(me: Myself) -> Self {
        Self {
            name: me.name,
            display_name: me.display_name,
            email: me.email_address,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectComponent {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectIssueType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subtask: bool,
}

/// Response of `GET /project/{key}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Project {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub components: Vec<ProjectComponent>,
    #[serde(default)]
    pub issue_types: Vec<ProjectIssueType>,
}

impl Project {
    /// Converts to domain metadata; `None` if Jira returned a blank key.
    pub fn into_metadata(self) -> Option<ProjectMetadata> {
        Some(ProjectMetadata {
            id: self.id,
            key: ProjectKey::new(self.key)?,
            components: self
                .components
                .into_iter()
                .map(|c| NamedEntity {
                    id: c.id,
                    name: c.name,
                    subtask: false,
                })
                .collect(),
            issue_types: self
                .issue_types
                .into_iter()
                .map(|t| NamedEntity {
                    id: t.id,
                    name: t.name,
                    subtask: t.subtask,
                })
                .collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Status {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionEntry {
    pub id: String,
    pub name: String,
    pub to: Option<Status>,
}

/// Response of `GET /issue/{key}/transitions`.
#[derive(Debug, Deserialize)]
pub(crate) struct Transitions {
    #[serde(default)]
    pub transitions: Vec<TransitionEntry>,
}

impl Transitions {
    /// Converts to domain transitions, dropping entries with a blank id.
    pub fn into_domain(self) -> Vec<Transition> {
        self.transitions
            .into_iter()
            .filter_map(|t| {
                Some(Transition {
                    id: TransitionId::new(t.id)?,
                    name: t.name,
                    target_status: t.to.map(|s| s.name),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pipeline::{AssigneeName, IssueKey, WorkDuration};
    use serde_json::json;

    use super::*;

    fn subtask(components: Vec<EntityRef>) -> NewSubtask {
        NewSubtask {
            project: EntityRef::Id("10000".into()),
            parent: IssueKey::new("BM-5610").unwrap(),
            issue_type: EntityRef::Name("Sub-task".into()),
            summary: "Install Minio".into(),
            assignee: AssigneeName::new("a.user").unwrap(),
            labels: vec!["DevOps".into()],
            components,
            original_estimate: WorkDuration::parse("4h 30m").unwrap(),
        }
    }

    #[test]
    fn test_create_request_shape() {
        let subtask = subtask(vec![EntityRef::Id("200".into())]);
        let body = serde_json::to_value(CreateIssueRequest::from(&subtask)).unwrap();
        assert_eq!(
            body,
            json!({
                "fields": {
                    "project": {"id": "10000"},
                    "parent": {"key": "BM-5610"},
                    "issuetype": {"name": "Sub-task"},
                    "summary": "Install Minio",
                    "assignee": {"name": "a.user"},
                    "labels": ["DevOps"],
                    "components": [{"id": "200"}],
                    "timetracking": {"originalEstimate": "4h 30m"}
                }
            })
        );
    }

    #[test]
    fn test_create_request_omits_empty_components() {
        let subtask = subtask(Vec::new());
        let body = serde_json::to_value(CreateIssueRequest::from(&subtask)).unwrap();
        assert!(body["fields"].get("components").is_none());
    }

    #[test]
    fn test_transitions_keep_target_status() {
        let parsed: Transitions = serde_json::from_value(json!({
            "expand": "transitions",
            "transitions": [
                {"id": "11", "name": "Start Progress", "to": {"name": "In Progress", "id": "3"}},
                {"id": "31", "name": "Resolve"}
            ]
        }))
        .unwrap();
        let transitions = parsed.into_domain();
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].target_status.as_deref(), Some("In Progress"));
        assert_eq!(transitions[1].target_status, None);
    }
}
