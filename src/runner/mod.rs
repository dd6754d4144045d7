//! Test runner: the orchestration core.
//!
//! Registered test cases are executed against fresh agents, one agent
//! per test run. Every failure mode of a test (a failed assertion or
//! any agent error) becomes a `failed` result; the
//! batch always runs to completion.

pub mod report;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::BoxFuture;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::agent::Agent;
use crate::client::TaskBackend;
use crate::config::Config;
use crate::error::ManagerError;
use crate::manager::AgentManager;

pub use report::{Report, ReportSummary, Reporter, TestResult, TestStatus};

/// A registered test body. Receives the test's agent; a clean return is
/// a pass, any error is a failure.
pub type TestFn = Arc<dyn Fn(Arc<Agent>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// A registered, named unit of test logic paired with a natural-language
/// instruction.
#[derive(Clone)]
pub struct TestCase {
    /// Case name. Duplicates are legal; run names disambiguate.
    pub name: String,
    /// Natural-language instruction sent to the remote service.
    pub description: String,
    /// Test body invoked with the case's agent.
    pub test_fn: TestFn,
    /// Tags used for filtering.
    pub tags: Vec<String>,
}

/// Runs registered test cases against the remote service and aggregates
/// their results.
///
/// Results accumulate across calls to [`run_tests`](Self::run_tests) on
/// the same runner; repeated calls append rather than replace.
pub struct TestRunner {
    config: Arc<Config>,
    manager: Arc<AgentManager>,
    cases: Vec<TestCase>,
    results: Vec<TestResult>,
}

impl TestRunner {
    /// Creates a runner over the given backend.
    pub fn new(config: Arc<Config>, backend: Arc<dyn TaskBackend>) -> Self {
        let manager = Arc::new(AgentManager::new(Arc::clone(&config), backend));
        Self {
            config,
            manager,
            cases: Vec::new(),
            results: Vec::new(),
        }
    }

    /// The manager owning this runner's agents.
    pub fn manager(&self) -> &Arc<AgentManager> {
        &self.manager
    }

    /// Registers a test case. Name uniqueness is not enforced; duplicate
    /// names produce independent executions.
    pub fn register_test<F, Fut>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        test_fn: F,
        tags: Vec<String>,
    ) where
        F: Fn(Arc<Agent>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = name.into();
        let boxed: TestFn = Arc::new(move |agent| Box::pin(test_fn(agent)));
        info!(test = %name, "registered test");
        self.cases.push(TestCase {
            name,
            description: description.into(),
            test_fn: boxed,
            tags,
        });
    }

    /// Number of registered cases.
    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    /// All results recorded so far, across every `run_tests` call.
    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    /// Runs a single case and returns its result. The manager must be
    /// started (or startable) for the agent to be created.
    pub async fn run_single_test(
        &self,
        case: &TestCase,
        instruction_override: Option<&str>,
    ) -> TestResult {
        execute_case(
            Arc::clone(&self.manager),
            case.clone(),
            instruction_override.map(str::to_string),
        )
        .await
    }

    /// Runs every registered case matching the filters.
    ///
    /// A case is selected when `test_names` is `None` or contains its
    /// name, and `tags` is `None` or intersects its tag set. With no
    /// matching case, returns an empty list, starts no agent, and
    /// leaves previously accumulated results untouched.
    ///
    /// Sequential mode preserves registration order. Parallel mode
    /// launches every selected case at once (bounded by
    /// `Config::max_parallel` when set) and keeps going when an
    /// individual task panics; such a task is logged and excluded.
    ///
    /// The manager is stopped when the run ends, whatever the outcome.
    pub async fn run_tests(
        &mut self,
        test_names: Option<&[String]>,
        tags: Option<&[String]>,
        parallel: bool,
    ) -> Result<Vec<TestResult>, ManagerError> {
        info!("starting test execution");
        self.manager.start().await?;

        let selected = self.filter_cases(test_names, tags);
        if selected.is_empty() {
            warn!("no tests matched the filters");
            self.manager.stop().await;
            return Ok(Vec::new());
        }

        if parallel {
            info!(count = selected.len(), "running tests in parallel");
            let limiter = self
                .config
                .max_parallel
                .map(|cap| Arc::new(Semaphore::new(cap)));

            let mut handles = Vec::with_capacity(selected.len());
            for case in selected {
                let manager = Arc::clone(&self.manager);
                let limiter = limiter.clone();
                handles.push(tokio::spawn(async move {
                    let _permit = match limiter {
                        Some(semaphore) => semaphore.acquire_owned().await.ok(),
                        None => None,
                    };
                    execute_case(manager, case, None).await
                }));
            }

            for handle in handles {
                match handle.await {
                    Ok(result) => self.results.push(result),
                    Err(e) => error!(error = %e, "test task aborted"),
                }
            }
        } else {
            info!(count = selected.len(), "running tests sequentially");
            for case in selected {
                let result = execute_case(Arc::clone(&self.manager), case, None).await;
                self.results.push(result);
            }
        }

        if let Err(e) = Reporter::new(&self.config.reports_dir).write(&self.results) {
            warn!(error = %e, "failed to write test report");
        }

        self.manager.stop().await;
        info!(total = self.results.len(), "test execution completed");
        Ok(self.results.clone())
    }

    /// Applies the name and tag filters to the registry.
    fn filter_cases(
        &self,
        test_names: Option<&[String]>,
        tags: Option<&[String]>,
    ) -> Vec<TestCase> {
        self.cases
            .iter()
            .filter(|case| {
                if let Some(names) = test_names {
                    if !names.iter().any(|n| *n == case.name) {
                        return false;
                    }
                }
                if let Some(tags) = tags {
                    if !tags.iter().any(|t| case.tags.contains(t)) {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect()
    }
}

/// Executes one case end to end: create the agent, call the test body,
/// tear the agent down, and wrap the outcome in a [`TestResult`].
///
/// Teardown happens whether the body returns or errors; the duration
/// spans agent creation through the teardown decision.
async fn execute_case(
    manager: Arc<AgentManager>,
    case: TestCase,
    instruction_override: Option<String>,
) -> TestResult {
    let started = Instant::now();
    let run_name = format!("{}_{}", case.name, Utc::now().timestamp_millis());
    info!(test = %run_name, "running test");

    let instruction = instruction_override.unwrap_or_else(|| {
        if case.description.is_empty() {
            format!("Execute test: {}", case.name)
        } else {
            case.description.clone()
        }
    });

    let outcome = match manager.create_agent(&instruction, Some(&run_name)).await {
        Ok(agent) => (case.test_fn)(agent).await,
        Err(e) => Err(anyhow::Error::new(e)),
    };

    // Teardown runs regardless of the test body's outcome.
    manager.remove_agent(&run_name).await;
    let duration = started.elapsed();

    match outcome {
        Ok(()) => {
            info!(test = %run_name, ?duration, "test passed");
            TestResult::passed(run_name, duration)
        }
        Err(e) => {
            let message = format!("{e:#}");
            error!(test = %run_name, error = %message, "test failed");
            TestResult::failed(run_name, duration, message)
        }
    }
}
