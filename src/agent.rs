//! Agent: a local proxy for one remote browser-automation task.
//!
//! An agent owns the task's instruction, the server-assigned task id once
//! one exists, a step log that only ever grows within a run, and the
//! terminal outcome. `run` drives the full lifecycle: validate the
//! instruction, create the remote task, poll it to a terminal status.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use regex::Regex;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::client::{Step, TaskBackend, TaskOptions, TaskStatus};
use crate::config::Config;
use crate::error::AgentError;

/// Instructions shorter than this are probably not a complete task.
const MIN_PLAUSIBLE_CHARS: usize = 12;

/// Instructions longer than this are probably a pasted document.
const MAX_PLAUSIBLE_CHARS: usize = 2000;

/// Patterns that look like automation code rather than natural language.
/// Matching is advisory only; the instruction is still sent as-is.
const AUTOMATION_CODE_PATTERN: &str = concat!(
    r"(?i)(querySelector|getElementById|waitForSelector|",
    r"page\.(click|goto|fill)|driver\.find_element|xpath\s*=)",
);

fn automation_code_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(AUTOMATION_CODE_PATTERN).expect("automation code pattern must compile")
    })
}

/// Mutable task state behind the agent's lock.
#[derive(Debug)]
struct AgentState {
    instruction: String,
    task_id: Option<String>,
    status: TaskStatus,
    steps: Vec<Step>,
    output: Option<String>,
    error: Option<String>,
    screenshot_url: Option<String>,
}

/// Local proxy for one in-flight or completed remote task.
///
/// Methods take `&self`; task state lives behind a lock so the manager
/// can hand out shared references. Concurrent `run` calls on the same
/// agent are not supported; the runner gives each test its own agent.
pub struct Agent {
    name: String,
    backend: Arc<dyn TaskBackend>,
    config: Arc<Config>,
    state: Mutex<AgentState>,
}

impl Agent {
    /// Creates an agent for the given instruction. No remote call is
    /// made until `run`.
    pub fn new(
        name: impl Into<String>,
        instruction: impl Into<String>,
        backend: Arc<dyn TaskBackend>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            name: name.into(),
            backend,
            config,
            state: Mutex::new(AgentState {
                instruction: instruction.into(),
                task_id: None,
                status: TaskStatus::Created,
                steps: Vec::new(),
                output: None,
                error: None,
                screenshot_url: None,
            }),
        }
    }

    /// The agent's local correlation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current instruction text.
    pub async fn instruction(&self) -> String {
        self.state.lock().await.instruction.clone()
    }

    /// The server-assigned task id, once a task has been created.
    pub async fn task_id(&self) -> Option<String> {
        self.state.lock().await.task_id.clone()
    }

    /// The last observed task status.
    pub async fn status(&self) -> TaskStatus {
        self.state.lock().await.status
    }

    /// Copy of the steps observed so far.
    pub async fn steps(&self) -> Vec<Step> {
        self.state.lock().await.steps.clone()
    }

    /// The remote error detail, if the task failed.
    pub async fn error(&self) -> Option<String> {
        self.state.lock().await.error.clone()
    }

    /// Runs the agent's instruction to completion.
    ///
    /// Creates a remote task and polls it at the configured interval
    /// until the service reports a terminal status. Returns the output
    /// text on `finished` or `stopped`; fails with
    /// [`AgentError::TaskFailed`] when the task ends `failed`, and with
    /// the underlying [`ClientError`](crate::error::ClientError) when a
    /// call to the service fails. Polling is not resumed after a
    /// transport failure.
    pub async fn run(&self) -> Result<String, AgentError> {
        let instruction = {
            let mut state = self.state.lock().await;
            validate_instruction(&state.instruction)?;
            // Fresh task: any state from a previous run on this agent
            // identity is superseded.
            state.task_id = None;
            state.status = TaskStatus::Created;
            state.steps.clear();
            state.output = None;
            state.error = None;
            state.instruction.clone()
        };

        let task_id = self
            .backend
            .create_task(&instruction, &TaskOptions::default())
            .await?;
        info!(agent = %self.name, task_id = %task_id, "remote task created");

        {
            let mut state = self.state.lock().await;
            state.task_id = Some(task_id.clone());
        }

        loop {
            let details = self.backend.task_details(&task_id).await?;

            let terminal = {
                let mut state = self.state.lock().await;

                // Append only the steps we have not seen yet; the step
                // log never shrinks within a run.
                if details.steps.len() > state.steps.len() {
                    for step in &details.steps[state.steps.len()..] {
                        debug!(agent = %self.name, step = step.number, goal = %step.goal, "step");
                    }
                    let new = details.steps[state.steps.len()..].to_vec();
                    state.steps.extend(new);
                }

                advance_status(&mut state.status, details.status);
                if details.output.is_some() {
                    state.output = details.output.clone();
                }
                if details.error.is_some() {
                    state.error = details.error.clone();
                }
                if details.screenshot_url.is_some() {
                    state.screenshot_url = details.screenshot_url.clone();
                }

                state.status.is_terminal()
            };

            if terminal {
                break;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }

        let state = self.state.lock().await;
        match state.status {
            TaskStatus::Failed => {
                let detail = state
                    .error
                    .clone()
                    .unwrap_or_else(|| "no error detail reported".to_string());
                Err(AgentError::TaskFailed(detail))
            }
            status => {
                info!(agent = %self.name, status = %status, "remote task ended");
                Ok(state.output.clone().unwrap_or_default())
            }
        }
    }

    /// Runs a follow-up instruction under this agent's identity.
    ///
    /// Swaps the instruction, delegates to [`run`](Self::run), and
    /// restores the original instruction whether or not the run
    /// succeeded. Must not be called concurrently with another run on
    /// the same agent.
    pub async fn execute_instruction(&self, text: &str) -> Result<String, AgentError> {
        let original = {
            let mut state = self.state.lock().await;
            std::mem::replace(&mut state.instruction, text.to_string())
        };

        let result = self.run().await;

        let mut state = self.state.lock().await;
        state.instruction = original;
        drop(state);

        result
    }

    /// Downloads the task's screenshot, if the service produced one.
    ///
    /// Writes to `path` when given, otherwise to a generated file under
    /// the configured screenshots directory. Returns `None` when there
    /// is no screenshot or when the download fails; this operation
    /// never raises.
    pub async fn take_screenshot(&self, path: Option<&Path>) -> Option<PathBuf> {
        let url = self.state.lock().await.screenshot_url.clone()?;

        let bytes = match self.backend.fetch_asset(&url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(agent = %self.name, error = %e, "screenshot download failed");
                return None;
            }
        };

        let target = match path {
            Some(p) => p.to_path_buf(),
            None => self
                .config
                .screenshots_dir
                .join(format!("{}_{}.png", self.name, Utc::now().timestamp())),
        };

        if let Some(parent) = target.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(agent = %self.name, error = %e, "screenshot directory creation failed");
                return None;
            }
        }
        if let Err(e) = std::fs::write(&target, bytes) {
            warn!(agent = %self.name, path = %target.display(), error = %e, "screenshot write failed");
            return None;
        }

        debug!(agent = %self.name, path = %target.display(), "screenshot saved");
        Some(target)
    }

    /// Stops the remote task. Fails with [`AgentError::NoTask`] before
    /// any task has been created.
    pub async fn stop(&self) -> Result<(), AgentError> {
        let task_id = self.task_id().await.ok_or(AgentError::NoTask)?;
        self.backend.stop_task(&task_id).await?;
        Ok(())
    }

    /// Pauses the remote task.
    pub async fn pause(&self) -> Result<(), AgentError> {
        let task_id = self.task_id().await.ok_or(AgentError::NoTask)?;
        self.backend.pause_task(&task_id).await?;
        Ok(())
    }

    /// Resumes the remote task.
    pub async fn resume(&self) -> Result<(), AgentError> {
        let task_id = self.task_id().await.ok_or(AgentError::NoTask)?;
        self.backend.resume_task(&task_id).await?;
        Ok(())
    }
}

/// Rejects empty instructions; logs advisory warnings for implausible
/// ones. A warning never fails the run.
fn validate_instruction(instruction: &str) -> Result<(), AgentError> {
    let trimmed = instruction.trim();
    if trimmed.is_empty() {
        return Err(AgentError::InvalidInstruction(
            "instruction must not be empty".to_string(),
        ));
    }

    if trimmed.len() < MIN_PLAUSIBLE_CHARS {
        warn!(
            len = trimmed.len(),
            "instruction is very short; the remote agent may lack context"
        );
    } else if trimmed.len() > MAX_PLAUSIBLE_CHARS {
        warn!(
            len = trimmed.len(),
            "instruction is very long; consider splitting it into follow-ups"
        );
    }

    if automation_code_regex().is_match(trimmed) {
        warn!("instruction looks like browser-automation code; the service expects natural language");
    }

    Ok(())
}

/// Moves the local status forward. Terminal statuses are sticky and a
/// non-terminal status never steps back to `created`.
fn advance_status(current: &mut TaskStatus, next: TaskStatus) {
    if current.is_terminal() {
        return;
    }
    if matches!(next, TaskStatus::Created) && !matches!(current, TaskStatus::Created) {
        return;
    }
    *current = next;
}
