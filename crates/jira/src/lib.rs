//! Jira issue-tracker infrastructure adapter.
//!
//! Implements the [`pipeline::IssueTracker`] trait against the Jira REST v2
//! API using `reqwest`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** URL layout, authentication headers, JSON wire shapes
//! and status-code mapping live here. The [`pipeline`] crate sees only
//! [`pipeline::IssueTracker`] and [`pipeline::SubmitError`].
//!
//! | Endpoint | Used by |
//! |----------|---------|
//! | `GET  /rest/api/2/myself` | [`IssueTracker::current_user`](pipeline::IssueTracker::current_user) |
//! | `GET  /rest/api/2/project/{key}` | [`IssueTracker::project`](pipeline::IssueTracker::project) |
//! | `POST /rest/api/2/issue` | [`IssueTracker::create_subtask`](pipeline::IssueTracker::create_subtask) |
//! | `POST /rest/api/2/issue/{key}/worklog` | [`IssueTracker::log_work`](pipeline::IssueTracker::log_work) |
//! | `GET  /rest/api/2/issue/{key}/transitions` | [`IssueTracker::transitions`](pipeline::IssueTracker::transitions) |
//! | `POST /rest/api/2/issue/{key}/transitions` | [`IssueTracker::execute_transition`](pipeline::IssueTracker::execute_transition) |

mod client;
mod error;
mod models;

pub use client::JiraClient;
pub use error::JiraError;
