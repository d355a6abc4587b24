//! Error taxonomy for a submission run.
//!
//! [`SubmitError`] covers both run-halting conditions (bad configuration, bad
//! input, failed preflight) and per-call failures against the issue tracker.
//! Whether an error halts the run or only the current record is decided by the
//! caller; [`SubmitError::is_fatal`] reports the default classification.
//!
//! Infrastructure crates define their own transport-level error types and
//! convert them into [`SubmitError`] at the port boundary.

use thiserror::Error;

use crate::IssueKey;

// ---------------------------------------------------------------------------
// Submission errors
// ---------------------------------------------------------------------------

/// Errors produced while configuring, parsing, or submitting a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// A required configuration value is missing, empty, or unparseable.
    ///
    /// Produced at load time; the run never starts with an invalid config.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// The input document could not be read or does not describe a valid
    /// list of task records.
    ///
    /// `index` is the zero-based position of the offending entry, or `None`
    /// when the problem concerns the document as a whole.
    #[error("{}", format_input_error(.index, .message))]
    InputFormat {
        /// Zero-based index of the offending task entry, if any.
        index: Option<usize>,
        /// Description of the problem.
        message: String,
    },

    /// The tracker answered with a non-success status.
    ///
    /// Status and body are reported verbatim, not parsed further.
    #[error("API error (HTTP {status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The tracker rejected the credentials (HTTP 401 or 403).
    ///
    /// Likely to recur for every subsequent record; no circuit breaker exists.
    #[error("Authentication failed (HTTP {status}): {body}")]
    Authentication {
        /// HTTP status code (401 or 403).
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The issue's workflow offers no transition into the `Done` status.
    #[error("No transition to 'Done' available for {issue} (available: {})", .available.join(", "))]
    TransitionUnavailable {
        /// Issue whose transitions were inspected.
        issue: IssueKey,
        /// Names of the transitions that were offered instead.
        available: Vec<String>,
    },

    /// The request never produced an HTTP response (connection refused,
    /// DNS failure, timeout).
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// A success response carried a body that could not be decoded.
    #[error("Unexpected response: {message}")]
    UnexpectedResponse {
        /// Description of the decoding failure.
        message: String,
    },
}

impl SubmitError {
    /// Builds the error for a non-success HTTP status, classifying 401 and 403
    /// as [`SubmitError::Authentication`].
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => Self::Authentication { status, body },
            _ => Self::Api { status, body },
        }
    }

    /// Builds an [`SubmitError::InputFormat`] naming the offending entry.
    pub fn input_at(index: usize, message: impl Into<String>) -> Self {
        Self::InputFormat {
            index: Some(index),
            message: message.into(),
        }
    }

    /// Builds an [`SubmitError::InputFormat`] about the document as a whole.
    pub fn input(message: impl Into<String>) -> Self {
        Self::InputFormat {
            index: None,
            message: message.into(),
        }
    }

    /// Builds a [`SubmitError::Configuration`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` for errors that abort the run before any record is
    /// processed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::InputFormat { .. })
    }
}

fn format_input_error(index: &Option<usize>, message: &str) -> String {
    match index {
        Some(i) => format!("Input format error in task entry {i}: {message}"),
        None => format!("Input format error: {message}"),
    }
}
