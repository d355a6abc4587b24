//! Shared value types for the submission domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! values with invariants (a [`WorkDuration`] always matches the duration
//! grammar and is non-zero) and participate in domain computations.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::IssueKey;

// ---------------------------------------------------------------------------
// Durations
// ---------------------------------------------------------------------------

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
/// Tracker working day.
const SECONDS_PER_DAY: u64 = 8 * SECONDS_PER_HOUR;
/// Tracker working week.
const SECONDS_PER_WEEK: u64 = 5 * SECONDS_PER_DAY;

static DURATION_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:[0-9]+[wdhm]\s*)+$").expect("duration grammar is a valid regex")
});

static DURATION_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9]+)([wdhm])").expect("duration term is a valid regex"));

/// Reason a string was rejected by [`WorkDuration::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    /// The string is empty or only whitespace.
    #[error("duration is empty")]
    Empty,
    /// The string does not match `<int><unit>` repeated, units in `w d h m`.
    #[error("expected <number><unit> terms with units w, d, h or m (e.g. \"2d\", \"4h 30m\")")]
    Grammar,
    /// A unit appears more than once (e.g. `"1h 2h"`).
    #[error("unit '{0}' appears more than once")]
    RepeatedUnit(char),
    /// Every term is zero.
    #[error("duration must be greater than zero")]
    Zero,
    /// The total does not fit in 64 bits of seconds.
    #[error("duration is too large")]
    Overflow,
}

/// A tracker duration string such as `"3h"` or `"1d 4h 30m"`.
///
/// The original text is kept verbatim (trimmed) because it is sent to the
/// tracker unchanged, both as the original estimate and as the logged time.
/// The value in seconds uses the tracker's working-time units: 1d = 8h,
/// 1w = 5d.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkDuration {
    text: String,
    seconds: u64,
}

impl WorkDuration {
    /// Validates `text` against the duration grammar.
    pub fn parse(text: &str) -> Result<Self, DurationError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(DurationError::Empty);
        }
        if !DURATION_GRAMMAR.is_match(trimmed) {
            return Err(DurationError::Grammar);
        }

        let mut seen = Vec::with_capacity(4);
        let mut seconds: u64 = 0;
        for caps in DURATION_TERM.captures_iter(trimmed) {
            let unit = caps[2]
                .chars()
                .next()
                .map(|c| c.to_ascii_lowercase())
                .ok_or(DurationError::Grammar)?;
            if seen.contains(&unit) {
                return Err(DurationError::RepeatedUnit(unit));
            }
            seen.push(unit);

            let amount: u64 = caps[1].parse().map_err(|_| DurationError::Overflow)?;
            let scale = match unit {
                'w' => SECONDS_PER_WEEK,
                'd' => SECONDS_PER_DAY,
                'h' => SECONDS_PER_HOUR,
                _ => SECONDS_PER_MINUTE,
            };
            seconds = amount
                .checked_mul(scale)
                .and_then(|s| seconds.checked_add(s))
                .ok_or(DurationError::Overflow)?;
        }

        if seconds == 0 {
            return Err(DurationError::Zero);
        }
        Ok(Self {
            text: trimmed.to_string(),
            seconds,
        })
    }

    /// Returns the duration exactly as it will be sent to the tracker.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns the duration in seconds of working time.
    pub fn as_seconds(&self) -> u64 {
        self.seconds
    }
}

impl std::fmt::Display for WorkDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl TryFrom<String> for WorkDuration {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).map_err(|e| e.to_string())
    }
}

impl From<WorkDuration> for String {
    fn from(value: WorkDuration) -> Self {
        value.text
    }
}

// ---------------------------------------------------------------------------
// Task records
// ---------------------------------------------------------------------------

/// One entry of the input document: the sub-task to create and the time to
/// estimate and log against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Sub-task summary (never empty).
    pub summary: String,
    /// Original estimate, also used as the logged time.
    pub original_estimate: WorkDuration,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Returns this timestamp moved back by `duration`.
    ///
    /// Saturates at the original value if the subtraction is out of range.
    pub fn minus(self, duration: &WorkDuration) -> Self {
        i64::try_from(duration.as_seconds())
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .and_then(|delta| self.0.checked_sub_signed(delta))
            .map_or(self, Self)
    }

    /// Renders the timestamp in the tracker's worklog format,
    /// `YYYY-MM-DDTHH:MM:SS.mmm+HHMM`, expressed in `offset`.
    pub fn to_tracker_string(self, offset: FixedOffset) -> String {
        self.0
            .with_timezone(&offset)
            .format("%Y-%m-%dT%H:%M:%S%.3f%z")
            .to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Terminal state of one record.
///
/// Records move `Pending -> Created -> Logged -> Done`; a failure at any step
/// ends the record in the matching `Failed*` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// Created, logged, and transitioned.
    Done,
    /// The sub-task was never created.
    FailedAtCreate,
    /// Created, but logging work failed.
    FailedAtLog,
    /// Created and logged, but the transition to Done failed.
    FailedAtTransition,
}

impl RecordState {
    /// Returns `true` when the sub-task exists but a follow-up step failed.
    pub fn is_partial(self) -> bool {
        matches!(self, Self::FailedAtLog | Self::FailedAtTransition)
    }
}

impl std::fmt::Display for RecordState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Done => "done",
            Self::FailedAtCreate => "failed at create",
            Self::FailedAtLog => "failed at log work",
            Self::FailedAtTransition => "failed at transition",
        };
        write!(f, "{s}")
    }
}

/// Outcome of submitting one [`TaskRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtaskResult {
    /// Zero-based position of the record in the input.
    pub index: usize,
    /// Summary of the record, for reporting.
    pub summary: String,
    /// Key of the created sub-task; `None` if creation failed.
    pub issue_key: Option<IssueKey>,
    /// Whether the worklog was accepted.
    pub logged: bool,
    /// Whether the transition to Done was accepted.
    pub transitioned: bool,
    /// Terminal state reached.
    pub state: RecordState,
    /// Message of the error that ended the record early, if any.
    pub error: Option<String>,
}

/// Count of records per outcome class across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTally {
    /// Records that reached `Done`.
    pub done: usize,
    /// Records whose sub-task exists but did not reach `Done`.
    pub partial: usize,
    /// Records whose sub-task was never created.
    pub failed: usize,
}

impl RunTally {
    /// Adds one record outcome to the tally.
    pub fn record(&mut self, state: RecordState) {
        match state {
            RecordState::Done => self.done += 1,
            RecordState::FailedAtCreate => self.failed += 1,
            RecordState::FailedAtLog | RecordState::FailedAtTransition => self.partial += 1,
        }
    }

    /// Total number of records counted.
    pub fn total(self) -> usize {
        self.done + self.partial + self.failed
    }

    /// Number of records that did not reach `Done`.
    pub fn incomplete(self) -> usize {
        self.partial + self.failed
    }

    /// Returns `true` when every record reached `Done`.
    pub fn all_done(self) -> bool {
        self.incomplete() == 0
    }
}

impl std::fmt::Display for RunTally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} done, {} partial, {} failed ({} total)",
            self.done,
            self.partial,
            self.failed,
            self.total()
        )
    }
}
