//! Error types for webrunner operations.
//!
//! Defines error types for the major subsystems:
//! - Remote task API client
//! - Agent lifecycle and polling
//! - Agent manager lifecycle
//! - Browser profile storage
//! - Report generation

use thiserror::Error;

/// Errors that can occur while talking to the remote task API.
///
/// This layer performs no retries; callers decide whether an error is
/// worth retrying.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to parse API response: {0}")]
    Parse(String),
}

/// Errors that can occur while driving an agent's remote task.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Invalid instruction: {0}")]
    InvalidInstruction(String),

    #[error("No remote task has been created for this agent")]
    NoTask,

    #[error("Remote task failed: {0}")]
    TaskFailed(String),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),
}

/// Errors that can occur during agent manager lifecycle operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Missing API key: set WEBRUNNER_API_KEY or provide one in the configuration")]
    MissingApiKey,
}

/// Errors that can occur during profile storage operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Profile '{0}' not found")]
    NotFound(String),

    #[error("Invalid profile name: {0}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while writing a test report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
