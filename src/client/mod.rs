//! Remote task API client.
//!
//! The remote service accepts a natural-language instruction, drives a
//! real browser asynchronously, and exposes task status, a growing step
//! log and a final output over HTTP. This module holds the wire types,
//! the [`TaskBackend`] seam and the reqwest-backed [`CloudClient`].
//!
//! No retries happen at this layer; retry policy belongs to callers.

pub mod fake;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::ClientError;

pub use fake::FakeBackend;

/// Status of a remote task as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Task accepted but not yet running.
    Created,
    /// Task is actively executing browser actions.
    Running,
    /// Task execution is paused.
    Paused,
    /// Task completed successfully.
    Finished,
    /// Task ended with an error.
    Failed,
    /// Task was stopped by an explicit control call.
    Stopped,
}

impl TaskStatus {
    /// Returns true for statuses after which no further transitions occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Stopped)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// One recorded action/observation emitted by the service while
/// executing a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Position of this step in the task's step sequence.
    #[serde(rename = "step", default)]
    pub number: u64,
    /// What the remote agent planned to do next.
    #[serde(rename = "next_goal", default)]
    pub goal: String,
    /// The remote agent's evaluation of its previous goal.
    #[serde(rename = "evaluation_previous_goal", default)]
    pub evaluation: Option<String>,
}

/// Full task state returned by `GET /task/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDetails {
    /// Current task status.
    pub status: TaskStatus,
    /// Steps recorded so far, in execution order.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Final output text; present only once the task finished.
    #[serde(default)]
    pub output: Option<String>,
    /// Error detail; present only when the task failed.
    #[serde(default)]
    pub error: Option<String>,
    /// Locator for a screenshot produced by the task, if any.
    #[serde(rename = "screenshot", default)]
    pub screenshot_url: Option<String>,
}

impl TaskDetails {
    /// Creates details with the given status and nothing else.
    pub fn with_status(status: TaskStatus) -> Self {
        Self {
            status,
            steps: Vec::new(),
            output: None,
            error: None,
            screenshot_url: None,
        }
    }
}

/// Optional knobs forwarded to the remote service at task creation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskOptions {
    /// LLM model the remote agent should use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
    /// Restrict navigation to these domains.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_domains: Option<Vec<String>>,
    /// Persist browser cookies across tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_browser_data: Option<bool>,
    /// Enable the remote adblocker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_adblock: Option<bool>,
    /// Route traffic through the remote proxy pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_proxy: Option<bool>,
    /// Highlight elements the remote agent interacts with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_elements: Option<bool>,
}

/// Seam between the orchestration core and the remote task service.
///
/// Two implementations exist: [`CloudClient`] for the real HTTP API and
/// [`FakeBackend`] for tests and offline development. Which one runs is
/// an explicit construction-time choice, never a runtime probe.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// Creates a remote task and returns its server-assigned identifier.
    async fn create_task(
        &self,
        instruction: &str,
        options: &TaskOptions,
    ) -> Result<String, ClientError>;

    /// Fetches the full current state of a task.
    async fn task_details(&self, task_id: &str) -> Result<TaskDetails, ClientError>;

    /// Stops a running task.
    async fn stop_task(&self, task_id: &str) -> Result<(), ClientError>;

    /// Pauses a running task.
    async fn pause_task(&self, task_id: &str) -> Result<(), ClientError>;

    /// Resumes a paused task.
    async fn resume_task(&self, task_id: &str) -> Result<(), ClientError>;

    /// Downloads an asset (screenshot, recording) by URL.
    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>, ClientError>;
}

/// Request body for `POST /run-task`.
#[derive(Debug, Serialize)]
struct CreateTaskRequest<'a> {
    task: &'a str,
    #[serde(flatten)]
    options: &'a TaskOptions,
}

/// Response body for `POST /run-task`.
#[derive(Debug, Deserialize)]
struct CreateTaskResponse {
    id: String,
}

/// HTTP client for the cloud browser-automation API.
pub struct CloudClient {
    /// Base URL for the API.
    api_base: String,
    /// API key sent as a Bearer token.
    api_key: String,
    /// HTTP client for making API requests.
    http_client: Client,
}

impl CloudClient {
    /// Creates a client from the runtime configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            http_client: Client::builder()
                .timeout(config.request_timeout)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Returns the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Classifies a non-success HTTP response into a `ClientError`.
    async fn classify_failure(response: reqwest::Response) -> ClientError {
        let code = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());

        if code == 401 || code == 403 {
            ClientError::Unauthorized(body)
        } else {
            ClientError::Api { code, message: body }
        }
    }

    /// Issues one of the `PUT /{action}-task?task_id=` control calls.
    async fn control_call(&self, action: &str, task_id: &str) -> Result<(), ClientError> {
        let url = format!("{}/{}-task", self.api_base, action);
        let response = self
            .http_client
            .put(&url)
            .bearer_auth(&self.api_key)
            .query(&[("task_id", task_id)])
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::classify_failure(response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl TaskBackend for CloudClient {
    async fn create_task(
        &self,
        instruction: &str,
        options: &TaskOptions,
    ) -> Result<String, ClientError> {
        let url = format!("{}/run-task", self.api_base);
        let body = CreateTaskRequest {
            task: instruction,
            options,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::classify_failure(response).await);
        }

        let created: CreateTaskResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        Ok(created.id)
    }

    async fn task_details(&self, task_id: &str) -> Result<TaskDetails, ClientError> {
        let url = format!("{}/task/{}", self.api_base, task_id);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::classify_failure(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    async fn stop_task(&self, task_id: &str) -> Result<(), ClientError> {
        self.control_call("stop", task_id).await
    }

    async fn pause_task(&self, task_id: &str) -> Result<(), ClientError> {
        self.control_call("pause", task_id).await
    }

    async fn resume_task(&self, task_id: &str) -> Result<(), ClientError> {
        self.control_call("resume", task_id).await
    }

    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::classify_failure(response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
