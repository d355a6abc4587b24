//! Error types for the Jira adapter.

use pipeline::SubmitError;
use thiserror::Error;

/// Errors that can occur when talking to the Jira REST API.
#[derive(Debug, Error)]
pub enum JiraError {
    /// The request could not be sent or the response could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Jira answered with a non-success status.
    #[error("Jira returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A success response body did not have the expected shape.
    #[error("Could not decode Jira response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<JiraError> for SubmitError {
    fn from(err: JiraError) -> Self {
        match err {
            JiraError::Status { status, body } => SubmitError::from_status(status, body),
            JiraError::Http(e) if e.is_decode() => SubmitError::UnexpectedResponse {
                message: e.to_string(),
            },
            JiraError::Http(e) => SubmitError::Transport {
                message: e.to_string(),
            },
            JiraError::Decode(e) => SubmitError::UnexpectedResponse {
                message: e.to_string(),
            },
        }
    }
}
