//! webrunner: test orchestration for natural-language web tests.
//!
//! Test cases pair a name with a natural-language instruction; each
//! execution dispatches the instruction to a remote browser-automation
//! service as an asynchronous task, polls it to completion, applies the
//! registered verdict function and aggregates the outcomes into a
//! report.

pub mod agent;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod manager;
pub mod profiles;
pub mod runner;
pub mod util;

// Re-export commonly used types
pub use agent::Agent;
pub use client::{CloudClient, FakeBackend, TaskBackend, TaskStatus};
pub use config::Config;
pub use error::{AgentError, ClientError, ManagerError, ProfileError, ReportError};
pub use manager::AgentManager;
pub use runner::{TestResult, TestRunner, TestStatus};
