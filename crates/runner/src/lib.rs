//! Sub-task submission orchestration.
//!
//! [`SubmissionRunner`] drives one run against any [`IssueTracker`]:
//!
//! 1. **Preflight**: verify the credentials and resolve the project's ids.
//!    A preflight failure aborts the run before any record is touched.
//! 2. **Per record**, in input order: create the sub-task, log work equal to
//!    its original estimate, transition it to `Done`. A failed step ends that
//!    record; the next record is still attempted.
//! 3. **Tally**: every record ends in one [`RecordState`]; the
//!    [`RunReport`] counts them.
//!
//! Execution is strictly sequential. Fixed pauses separate the steps of a
//! record and the records themselves to stay under the tracker's rate limit.
//!
//! ## Architectural Layer
//!
//! **Orchestration.** Sequences calls between the [`pipeline`] domain and the
//! [`IssueTracker`] port. Contains no HTTP details.

use std::time::Duration;

use chrono::FixedOffset;
use pipeline::{
    AssigneeName, EntityRef, IssueKey, IssueTracker, NewSubtask, ProjectKey, RecordState,
    RunTally, SubmitConfig, SubmitError, SubtaskResult, TaskRecord, Timestamp, WorklogEntry,
    DEFAULT_SUBTASK_TYPE,
};
use tracing::{error, info, instrument, warn};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Everything a run needs beyond the tracker and the records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Parent issue shared by every sub-task of the run.
    pub parent: IssueKey,
    /// Project the sub-tasks are created in.
    pub project_key: ProjectKey,
    /// Assignee of every sub-task.
    pub assignee: AssigneeName,
    /// The single label set on every sub-task.
    pub label: String,
    /// The single component set on every sub-task.
    pub component: String,
    /// Offset used to render worklog start times.
    pub worklog_offset: FixedOffset,
    /// Pause between records.
    pub record_delay: Duration,
    /// Pause between the steps of one record.
    pub step_delay: Duration,
}

impl RunSettings {
    /// Derives run settings from the loaded configuration and the parent
    /// selected for this run.
    pub fn from_config(config: &SubmitConfig, parent: IssueKey) -> Self {
        Self {
            parent,
            project_key: config.project_key.clone(),
            assignee: config.assignee.clone(),
            label: config.label.clone(),
            component: config.component.clone(),
            worklog_offset: config.worklog_offset,
            record_delay: config.record_delay,
            step_delay: config.step_delay,
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Parent every sub-task was created under.
    pub parent: IssueKey,
    /// One result per input record, in input order.
    pub results: Vec<SubtaskResult>,
}

impl RunReport {
    /// Counts the results per outcome class.
    pub fn tally(&self) -> RunTally {
        let mut tally = RunTally::default();
        for result in &self.results {
            tally.record(result.state);
        }
        tally
    }

    /// Keys of every sub-task that was created, whatever its final state.
    pub fn created_keys(&self) -> Vec<&IssueKey> {
        self.results
            .iter()
            .filter_map(|r| r.issue_key.as_ref())
            .collect()
    }

    /// Returns `true` when every record reached `Done`.
    pub fn all_done(&self) -> bool {
        self.tally().all_done()
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Project-derived parts of every create payload, resolved once in preflight.
#[derive(Debug, Clone)]
struct SubtaskTarget {
    project: EntityRef,
    issue_type: EntityRef,
    components: Vec<EntityRef>,
}

/// Runs the submission pipeline against an [`IssueTracker`].
pub struct SubmissionRunner<'a, T: IssueTracker + ?Sized> {
    tracker: &'a T,
    settings: RunSettings,
    clock: fn() -> Timestamp,
}

impl<'a, T: IssueTracker + ?Sized> SubmissionRunner<'a, T> {
    /// Creates a runner using the system clock.
    pub fn new(tracker: &'a T, settings: RunSettings) -> Self {
        Self {
            tracker,
            settings,
            clock: Timestamp::now,
        }
    }

    /// Replaces the clock used to compute worklog start times.
    pub fn with_clock(mut self, clock: fn() -> Timestamp) -> Self {
        self.clock = clock;
        self
    }

    /// Submits every record and returns the per-record results.
    ///
    /// Returns `Err` only when preflight fails; per-record failures are part of
    /// the report.
    #[instrument(skip_all, fields(parent = %self.settings.parent, records = records.len()))]
    pub async fn run(&self, records: &[TaskRecord]) -> Result<RunReport, SubmitError> {
        let target = self.preflight().await?;

        let mut results = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if index > 0 {
                pause(self.settings.record_delay).await;
            }
            results.push(self.submit_record(index, record, &target).await);
        }

        let report = RunReport {
            parent: self.settings.parent.clone(),
            results,
        };
        let tally = report.tally();
        info!(
            done = tally.done,
            partial = tally.partial,
            failed = tally.failed,
            "Run finished"
        );
        Ok(report)
    }

    async fn preflight(&self) -> Result<SubtaskTarget, SubmitError> {
        let user = self.tracker.current_user().await.inspect_err(|e| {
            error!(error = %e, "Could not verify tracker credentials");
        })?;
        info!(
            user = %user.display_name,
            email = user.email.as_deref().unwrap_or("-"),
            "Connected to issue tracker"
        );

        let project = self
            .tracker
            .project(&self.settings.project_key)
            .await
            .inspect_err(|e| {
                error!(project = %self.settings.project_key, error = %e, "Could not load project");
            })?;

        let issue_type = match project.subtask_type_id() {
            Some(id) => EntityRef::Id(id.to_string()),
            None => {
                warn!(
                    project = %project.key,
                    "Project lists no sub-task issue type; referencing it by name"
                );
                EntityRef::Name(DEFAULT_SUBTASK_TYPE.to_string())
            }
        };
        let components = match project.component_id(&self.settings.component) {
            Some(id) => vec![EntityRef::Id(id.to_string())],
            None => {
                warn!(
                    project = %project.key,
                    component = %self.settings.component,
                    "Component not found; sub-tasks will be created without it"
                );
                Vec::new()
            }
        };

        Ok(SubtaskTarget {
            project: EntityRef::Id(project.id),
            issue_type,
            components,
        })
    }

    #[instrument(skip_all, fields(index = index, summary = %record.summary))]
    async fn submit_record(
        &self,
        index: usize,
        record: &TaskRecord,
        target: &SubtaskTarget,
    ) -> SubtaskResult {
        let mut result = SubtaskResult {
            index,
            summary: record.summary.clone(),
            issue_key: None,
            logged: false,
            transitioned: false,
            state: RecordState::FailedAtCreate,
            error: None,
        };

        // Pending -> Created
        let subtask = NewSubtask {
            project: target.project.clone(),
            parent: self.settings.parent.clone(),
            issue_type: target.issue_type.clone(),
            summary: record.summary.clone(),
            assignee: self.settings.assignee.clone(),
            labels: vec![self.settings.label.clone()],
            components: target.components.clone(),
            original_estimate: record.original_estimate.clone(),
        };
        let key = match self.tracker.create_subtask(&subtask).await {
            Ok(key) => key,
            Err(e) => {
                error!(index, summary = %record.summary, error = %e, "Failed to create sub-task");
                result.error = Some(e.to_string());
                return result;
            }
        };
        info!(index, issue = %key, "Created sub-task");
        result.issue_key = Some(key.clone());

        // Created -> Logged
        pause(self.settings.step_delay).await;
        let entry = WorklogEntry {
            time_spent: record.original_estimate.clone(),
            started: (self.clock)()
                .minus(&record.original_estimate)
                .to_tracker_string(self.settings.worklog_offset),
            comment: record.summary.clone(),
        };
        if let Err(e) = self.tracker.log_work(&key, &entry).await {
            error!(index, issue = %key, error = %e, "Failed to log work");
            result.state = RecordState::FailedAtLog;
            result.error = Some(e.to_string());
            return result;
        }
        info!(index, issue = %key, time_spent = %entry.time_spent, "Logged work");
        result.logged = true;

        // Logged -> Done
        pause(self.settings.step_delay).await;
        match self.tracker.transition_to_done(&key).await {
            Ok(transition) => {
                info!(index, issue = %key, transition = %transition.name, "Transitioned to Done");
                result.transitioned = true;
                result.state = RecordState::Done;
            }
            Err(e) => {
                error!(index, issue = %key, error = %e, "Failed to transition to Done");
                result.state = RecordState::FailedAtTransition;
                result.error = Some(e.to_string());
            }
        }
        result
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
