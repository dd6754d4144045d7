//! Scripted in-memory task backend.
//!
//! Stands in for the cloud service in tests and offline development.
//! Each poll pops the next scripted [`TaskDetails`]; once the script is
//! exhausted the last entry repeats, so a task scripted to finish stays
//! finished.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{TaskBackend, TaskDetails, TaskOptions, TaskStatus};
use crate::error::ClientError;

/// One scripted poll outcome.
enum PollScript {
    Details(TaskDetails),
    TransportError(String),
}

struct FakeState {
    polls: VecDeque<PollScript>,
    last: Option<TaskDetails>,
    create_error: Option<ClientError>,
    created: Vec<String>,
    poll_count: usize,
    stopped: Vec<String>,
    paused: Vec<String>,
    resumed: Vec<String>,
    assets: HashMap<String, Vec<u8>>,
}

/// In-memory [`TaskBackend`] driven by a scripted poll sequence.
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    /// Creates a backend with an explicit poll script.
    pub fn scripted(polls: Vec<TaskDetails>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                polls: polls.into_iter().map(PollScript::Details).collect(),
                last: None,
                create_error: None,
                created: Vec::new(),
                poll_count: 0,
                stopped: Vec::new(),
                paused: Vec::new(),
                resumed: Vec::new(),
                assets: HashMap::new(),
            }),
        }
    }

    /// Creates a backend whose task finishes on the first poll with the
    /// given output.
    pub fn finishing_with(output: impl Into<String>) -> Self {
        let mut details = TaskDetails::with_status(TaskStatus::Finished);
        details.output = Some(output.into());
        Self::scripted(vec![details])
    }

    /// Creates a backend whose task fails on the first poll with the
    /// given error detail.
    pub fn failing_with(error: impl Into<String>) -> Self {
        let mut details = TaskDetails::with_status(TaskStatus::Failed);
        details.error = Some(error.into());
        Self::scripted(vec![details])
    }

    /// Makes the next `create_task` call fail with the given error.
    pub fn with_create_error(self, error: ClientError) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.create_error = Some(error);
        }
        self
    }

    /// Inserts a transport failure at the current end of the poll script.
    pub fn with_poll_transport_error(self, message: impl Into<String>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state
                .polls
                .push_back(PollScript::TransportError(message.into()));
        }
        self
    }

    /// Registers downloadable bytes for an asset URL.
    pub fn with_asset(self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.assets.insert(url.into(), bytes);
        }
        self
    }

    /// Instructions passed to `create_task`, in call order.
    pub fn created_tasks(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    /// Number of `task_details` calls made so far.
    pub fn poll_count(&self) -> usize {
        self.state.lock().unwrap().poll_count
    }

    /// Task ids passed to `stop_task`, in call order.
    pub fn stopped_tasks(&self) -> Vec<String> {
        self.state.lock().unwrap().stopped.clone()
    }
}

#[async_trait]
impl TaskBackend for FakeBackend {
    async fn create_task(
        &self,
        instruction: &str,
        _options: &TaskOptions,
    ) -> Result<String, ClientError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.create_error.take() {
            return Err(error);
        }
        state.created.push(instruction.to_string());
        Ok(format!("task-{}", Uuid::new_v4().simple()))
    }

    async fn task_details(&self, _task_id: &str) -> Result<TaskDetails, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.poll_count += 1;

        match state.polls.pop_front() {
            Some(PollScript::Details(details)) => {
                state.last = Some(details.clone());
                Ok(details)
            }
            Some(PollScript::TransportError(message)) => Err(ClientError::Transport(message)),
            None => state.last.clone().ok_or_else(|| ClientError::Api {
                code: 404,
                message: "poll script exhausted with no prior details".to_string(),
            }),
        }
    }

    async fn stop_task(&self, task_id: &str) -> Result<(), ClientError> {
        self.state.lock().unwrap().stopped.push(task_id.to_string());
        Ok(())
    }

    async fn pause_task(&self, task_id: &str) -> Result<(), ClientError> {
        self.state.lock().unwrap().paused.push(task_id.to_string());
        Ok(())
    }

    async fn resume_task(&self, task_id: &str) -> Result<(), ClientError> {
        self.state.lock().unwrap().resumed.push(task_id.to_string());
        Ok(())
    }

    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        let state = self.state.lock().unwrap();
        state.assets.get(url).cloned().ok_or_else(|| ClientError::Api {
            code: 404,
            message: format!("no asset registered for {url}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_repeats_last_entry_when_exhausted() {
        let backend = FakeBackend::finishing_with("OK");
        let id = backend
            .create_task("go somewhere", &TaskOptions::default())
            .await
            .unwrap();

        let first = backend.task_details(&id).await.unwrap();
        let second = backend.task_details(&id).await.unwrap();
        assert_eq!(first.status, TaskStatus::Finished);
        assert_eq!(second.status, TaskStatus::Finished);
        assert_eq!(second.output.as_deref(), Some("OK"));
        assert_eq!(backend.poll_count(), 2);
    }

    #[tokio::test]
    async fn test_create_error_fires_once() {
        let backend = FakeBackend::finishing_with("OK")
            .with_create_error(ClientError::Unauthorized("bad key".to_string()));

        let first = backend.create_task("x", &TaskOptions::default()).await;
        assert!(matches!(first, Err(ClientError::Unauthorized(_))));

        let second = backend.create_task("x", &TaskOptions::default()).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_scripted_transport_error_surfaces_in_order() {
        let backend = FakeBackend::scripted(vec![TaskDetails::with_status(TaskStatus::Running)])
            .with_poll_transport_error("connection reset");

        let id = backend
            .create_task("x", &TaskOptions::default())
            .await
            .unwrap();
        assert!(backend.task_details(&id).await.is_ok());
        assert!(matches!(
            backend.task_details(&id).await,
            Err(ClientError::Transport(_))
        ));
    }
}
