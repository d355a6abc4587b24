//! [`JiraClient`]: the reqwest-backed [`IssueTracker`].

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{
    Credentials, IssueKey, IssueTracker, NewSubtask, ProjectKey, ProjectMetadata, SubmitConfig,
    SubmitError, TrackerUser, Transition, TransitionId, WorklogEntry,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::JiraError;
use crate::models::{
    CreateIssueRequest, CreatedIssue, Myself, Project, TransitionReference, TransitionRequest,
    Transitions, WorklogRequest,
};

const API_PREFIX: &str = "rest/api/2";
const JSON: &str = "application/json";

/// Jira REST v2 client.
///
/// Every request carries the configured credentials and JSON content
/// negotiation headers. Non-2xx responses surface as [`SubmitError::Api`] or
/// [`SubmitError::Authentication`] with the response body attached.
#[derive(Debug, Clone)]
pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl JiraClient {
    /// Builds a client for `base_url` (scheme and host, without `/rest/...`).
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, JiraError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    /// Builds a client from the loaded run configuration.
    pub fn from_config(config: &SubmitConfig) -> Result<Self, JiraError> {
        Self::new(
            config.base_url.clone(),
            config.credentials.clone(),
            config.request_timeout,
        )
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{API_PREFIX}/{path}", self.base_url);
        let builder = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, JSON)
            .header(ACCEPT, JSON);
        match &self.credentials {
            Credentials::Bearer(token) => builder.bearer_auth(token),
            Credentials::Basic { username, password } => {
                builder.basic_auth(username, Some(password))
            }
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<Response, JiraError> {
        let response = builder.send().await?;
        let status = response.status();
        debug!(%method, path, status = status.as_u16(), "Jira response");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(JiraError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, JiraError> {
        let response = self
            .send(Method::GET, path, self.request(Method::GET, path))
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, JiraError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn current_user(&self) -> Result<TrackerUser, SubmitError> {
        let me: Myself = self.get_json("myself").await?;
        Ok(me.into())
    }

    async fn project(&self, key: &ProjectKey) -> Result<ProjectMetadata, SubmitError> {
        let project: Project = self.get_json(&format!("project/{key}")).await?;
        project
            .into_metadata()
            .ok_or_else(|| SubmitError::UnexpectedResponse {
                message: format!("project {key} returned a blank key"),
            })
    }

    async fn create_subtask(&self, subtask: &NewSubtask) -> Result<IssueKey, SubmitError> {
        let path = "issue";
        let builder = self
            .request(Method::POST, path)
            .json(&CreateIssueRequest::from(subtask));
        let response = self.send(Method::POST, path, builder).await?;
        let created: CreatedIssue = decode(response).await?;
        IssueKey::new(created.key).ok_or_else(|| SubmitError::UnexpectedResponse {
            message: "create response carried a blank issue key".to_string(),
        })
    }

    async fn log_work(&self, issue: &IssueKey, entry: &WorklogEntry) -> Result<(), SubmitError> {
        let path = format!("issue/{issue}/worklog");
        let builder = self
            .request(Method::POST, &path)
            .json(&WorklogRequest::from(entry));
        self.send(Method::POST, &path, builder).await?;
        Ok(())
    }

    async fn transitions(&self, issue: &IssueKey) -> Result<Vec<Transition>, SubmitError> {
        let transitions: Transitions = self
            .get_json(&format!("issue/{issue}/transitions"))
            .await?;
        Ok(transitions.into_domain())
    }

    async fn execute_transition(
        &self,
        issue: &IssueKey,
        id: &TransitionId,
    ) -> Result<(), SubmitError> {
        let path = format!("issue/{issue}/transitions");
        let body = TransitionRequest {
            transition: TransitionReference { id: id.as_str() },
        };
        let builder = self.request(Method::POST, &path).json(&body);
        self.send(Method::POST, &path, builder).await?;
        Ok(())
    }
}
