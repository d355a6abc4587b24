//! Core domain for submitting sub-tasks to an issue tracker.
//!
//! This crate contains every domain concept, newtype identifier, value type,
//! and error type used by the submission run, plus the [`IssueTracker`] port
//! that infrastructure crates implement. It never talks to the network.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`IssueKey`, `ProjectKey`, `RunId`, etc.) |
//! | [`types`] | Value types (`WorkDuration`, `TaskRecord`, `RunTally`, etc.) |
//! | [`errors`] | The [`SubmitError`] taxonomy |
//! | [`config`] | Environment-backed [`SubmitConfig`] |
//! | [`input`] | Task list parsing (CSV, YAML) |
//! | [`parent`] | File-name based parent selection |
//! | [`tracker`] | The [`IssueTracker`] port and its request/response types |

pub mod config;
pub mod errors;
pub mod identifiers;
pub mod input;
pub mod parent;
pub mod tracker;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{Credentials, SubmitConfig};
pub use errors::SubmitError;
pub use identifiers::{AssigneeName, IssueKey, ProjectKey, RunId, TransitionId};
pub use input::{load_task_file, parse_task_csv, parse_task_document};
pub use parent::{resolve_parent, ParentKeys, ParentRule, ParentSelection};
pub use tracker::{
    select_done_transition, EntityRef, IssueTracker, NamedEntity, NewSubtask, ProjectMetadata,
    TrackerUser, Transition, WorklogEntry, DEFAULT_SUBTASK_TYPE, DONE_STATUS,
};
pub use types::{
    DurationError, RecordState, RunTally, SubtaskResult, TaskRecord, Timestamp, WorkDuration,
};
