//! Run configuration loaded from the process environment.
//!
//! [`SubmitConfig`] is built once at the composition root and passed by
//! reference to everything that needs it; nothing reads the environment after
//! startup.
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `JIRA_BASE_URL` | yes | |
//! | `JIRA_TOKEN` | token or user/password | |
//! | `JIRA_USERNAME` / `JIRA_PASSWORD` | token or user/password | |
//! | `ASSIGNEE_USERNAME` | yes | |
//! | `MAINTENANCE_PARENT_ISSUE_KEY` | yes | |
//! | `DEVELOP_PARENT_ISSUE_KEY` | yes | |
//! | `JIRA_PROJECT_KEY` | no | `BM` |
//! | `SUBTASK_LABEL` | no | `DevOps` |
//! | `SUBTASK_COMPONENT` | no | `DevOps` |
//! | `WORKLOG_UTC_OFFSET` | no | `+03:30` |
//! | `SUBMIT_RECORD_DELAY_MS` | no | `3000` |
//! | `SUBMIT_STEP_DELAY_MS` | no | `2000` |
//! | `JIRA_TIMEOUT_SECS` | no | `30` |

use std::time::Duration;

use chrono::FixedOffset;
use tracing::warn;

use crate::{AssigneeName, IssueKey, ParentKeys, ProjectKey, SubmitError};

pub const ENV_BASE_URL: &str = "JIRA_BASE_URL";
pub const ENV_TOKEN: &str = "JIRA_TOKEN";
pub const ENV_USERNAME: &str = "JIRA_USERNAME";
pub const ENV_PASSWORD: &str = "JIRA_PASSWORD";
pub const ENV_ASSIGNEE: &str = "ASSIGNEE_USERNAME";
pub const ENV_MAINTENANCE_PARENT: &str = "MAINTENANCE_PARENT_ISSUE_KEY";
pub const ENV_DEVELOP_PARENT: &str = "DEVELOP_PARENT_ISSUE_KEY";
pub const ENV_PROJECT_KEY: &str = "JIRA_PROJECT_KEY";
pub const ENV_LABEL: &str = "SUBTASK_LABEL";
pub const ENV_COMPONENT: &str = "SUBTASK_COMPONENT";
pub const ENV_WORKLOG_OFFSET: &str = "WORKLOG_UTC_OFFSET";
pub const ENV_RECORD_DELAY_MS: &str = "SUBMIT_RECORD_DELAY_MS";
pub const ENV_STEP_DELAY_MS: &str = "SUBMIT_STEP_DELAY_MS";
pub const ENV_TIMEOUT_SECS: &str = "JIRA_TIMEOUT_SECS";

const DEFAULT_PROJECT_KEY: &str = "BM";
const DEFAULT_LABEL: &str = "DevOps";
const DEFAULT_COMPONENT: &str = "DevOps";
const DEFAULT_WORKLOG_OFFSET: &str = "+03:30";
const DEFAULT_RECORD_DELAY_MS: u64 = 3000;
const DEFAULT_STEP_DELAY_MS: u64 = 2000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How every request authenticates against the tracker.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// HTTP basic authentication.
    Basic {
        /// Account name.
        username: String,
        /// Password or API token.
        password: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Immutable settings for one submission run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitConfig {
    /// API base URL without a trailing slash.
    pub base_url: String,
    /// Request authentication.
    pub credentials: Credentials,
    /// User every sub-task is assigned to.
    pub assignee: AssigneeName,
    /// Parent issues selectable by file name.
    pub parents: ParentKeys,
    /// Project holding the parent issues.
    pub project_key: ProjectKey,
    /// Label set on every sub-task.
    pub label: String,
    /// Component name set on every sub-task.
    pub component: String,
    /// Offset used when rendering worklog start times.
    pub worklog_offset: FixedOffset,
    /// Pause between records.
    pub record_delay: Duration,
    /// Pause between the steps of one record.
    pub step_delay: Duration,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl SubmitConfig {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self, SubmitError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads the configuration through `lookup`, which maps a variable name to
    /// its value. Empty and whitespace-only values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SubmitError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |name: &str| {
            get(name).ok_or_else(|| SubmitError::config(format!("{name} is not set")))
        };

        let base_url = require(ENV_BASE_URL)?.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(SubmitError::config(format!(
                "{ENV_BASE_URL} must start with http:// or https://"
            )));
        }

        let credentials = credentials(get(ENV_TOKEN), get(ENV_USERNAME), get(ENV_PASSWORD))?;

        let assignee = AssigneeName::new(require(ENV_ASSIGNEE)?)
            .ok_or_else(|| SubmitError::config(format!("{ENV_ASSIGNEE} is not set")))?;
        let parents = ParentKeys {
            maintenance: issue_key(ENV_MAINTENANCE_PARENT, require(ENV_MAINTENANCE_PARENT)?)?,
            develop: issue_key(ENV_DEVELOP_PARENT, require(ENV_DEVELOP_PARENT)?)?,
        };
        let project_key = ProjectKey::new(
            get(ENV_PROJECT_KEY).unwrap_or_else(|| DEFAULT_PROJECT_KEY.to_string()),
        )
        .ok_or_else(|| SubmitError::config(format!("{ENV_PROJECT_KEY} is empty")))?;

        let offset_text =
            get(ENV_WORKLOG_OFFSET).unwrap_or_else(|| DEFAULT_WORKLOG_OFFSET.to_string());
        let worklog_offset = offset_text.parse::<FixedOffset>().map_err(|e| {
            SubmitError::config(format!(
                "{ENV_WORKLOG_OFFSET} {offset_text:?} is not a UTC offset like +03:30: {e}"
            ))
        })?;

        let request_timeout = Duration::from_secs(number(
            ENV_TIMEOUT_SECS,
            get(ENV_TIMEOUT_SECS),
            DEFAULT_TIMEOUT_SECS,
        )?);
        if request_timeout.is_zero() {
            return Err(SubmitError::config(format!(
                "{ENV_TIMEOUT_SECS} must be at least 1 second"
            )));
        }

        Ok(Self {
            base_url,
            credentials,
            assignee,
            parents,
            project_key,
            label: get(ENV_LABEL).unwrap_or_else(|| DEFAULT_LABEL.to_string()),
            component: get(ENV_COMPONENT).unwrap_or_else(|| DEFAULT_COMPONENT.to_string()),
            worklog_offset,
            record_delay: Duration::from_millis(number(
                ENV_RECORD_DELAY_MS,
                get(ENV_RECORD_DELAY_MS),
                DEFAULT_RECORD_DELAY_MS,
            )?),
            step_delay: Duration::from_millis(number(
                ENV_STEP_DELAY_MS,
                get(ENV_STEP_DELAY_MS),
                DEFAULT_STEP_DELAY_MS,
            )?),
            request_timeout,
        })
    }
}

/// Picks the credential source. A token wins over a user/password pair.
fn credentials(
    token: Option<String>,
    username: Option<String>,
    password: Option<String>,
) -> Result<Credentials, SubmitError> {
    let basic = match (username, password) {
        (Some(username), Some(password)) => Some(Credentials::Basic { username, password }),
        (None, None) => None,
        (Some(_), None) => {
            return Err(SubmitError::config(format!(
                "{ENV_USERNAME} is set but {ENV_PASSWORD} is not"
            )))
        }
        (None, Some(_)) => {
            return Err(SubmitError::config(format!(
                "{ENV_PASSWORD} is set but {ENV_USERNAME} is not"
            )))
        }
    };

    match (token, basic) {
        (Some(token), Some(_)) => {
            warn!("{ENV_TOKEN} and {ENV_USERNAME}/{ENV_PASSWORD} are both set; using the token");
            Ok(Credentials::Bearer(token))
        }
        (Some(token), None) => Ok(Credentials::Bearer(token)),
        (None, Some(basic)) => Ok(basic),
        (None, None) => Err(SubmitError::config(format!(
            "no credentials: set {ENV_TOKEN} or {ENV_USERNAME} and {ENV_PASSWORD}"
        ))),
    }
}

fn issue_key(name: &str, value: String) -> Result<IssueKey, SubmitError> {
    IssueKey::new(value).ok_or_else(|| SubmitError::config(format!("{name} is not set")))
}

fn number(name: &str, value: Option<String>, default: u64) -> Result<u64, SubmitError> {
    match value {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| {
            SubmitError::config(format!("{name} must be a non-negative integer, got {v:?}"))
        }),
    }
}
