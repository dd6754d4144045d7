//! Runtime configuration for webrunner.
//!
//! Configuration is an explicit value passed into the client, manager and
//! runner constructors. Nothing in the crate reads environment variables
//! after startup; `Config::from_env` is the single place where the
//! process environment is consulted.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default base URL for the remote browser-automation API.
pub const DEFAULT_API_BASE: &str = "https://api.browser-use.com/api/v1";

/// Default interval between status polls for an in-flight task.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default timeout for a single HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration shared by the client, manager and runner.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the remote service. Validated at manager start.
    pub api_key: String,
    /// Base URL for the remote task API.
    pub api_base: String,
    /// Interval between successive task-detail polls.
    pub poll_interval: Duration,
    /// Timeout applied to each individual HTTP request.
    pub request_timeout: Duration,
    /// Upper bound on concurrently in-flight tests in parallel mode.
    /// `None` means unbounded fan-out.
    pub max_parallel: Option<usize>,
    /// Directory for JSON test reports.
    pub reports_dir: PathBuf,
    /// Directory for downloaded screenshots.
    pub screenshots_dir: PathBuf,
    /// Directory for persisted browser profiles.
    pub profiles_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_parallel: None,
            reports_dir: PathBuf::from("reports"),
            screenshots_dir: PathBuf::from("screenshots"),
            profiles_dir: PathBuf::from("profiles"),
        }
    }
}

impl Config {
    /// Builds a configuration from environment variables.
    ///
    /// Recognized variables:
    /// - `WEBRUNNER_API_KEY`: API key for the remote service
    /// - `WEBRUNNER_API_BASE`: base URL override
    /// - `WEBRUNNER_POLL_INTERVAL_SECS`: poll interval in seconds
    /// - `WEBRUNNER_MAX_PARALLEL`: cap on concurrent tests in parallel mode
    ///
    /// Unset or unparsable values fall back to the defaults. A missing
    /// API key is not an error here; it surfaces as
    /// `ManagerError::MissingApiKey` when the manager starts.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = env::var("WEBRUNNER_API_KEY") {
            config.api_key = key;
        }
        if let Ok(base) = env::var("WEBRUNNER_API_BASE") {
            config.api_base = base;
        }
        if let Some(secs) = env::var("WEBRUNNER_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(cap) = env::var("WEBRUNNER_MAX_PARALLEL")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            config.max_parallel = Some(cap);
        }

        config
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Sets the API base URL.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the per-request HTTP timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the parallel-mode concurrency cap.
    pub fn with_max_parallel(mut self, cap: usize) -> Self {
        self.max_parallel = Some(cap);
        self
    }

    /// Sets the reports directory.
    pub fn with_reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = dir.into();
        self
    }

    /// Sets the screenshots directory.
    pub fn with_screenshots_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshots_dir = dir.into();
        self
    }

    /// Sets the profiles directory.
    pub fn with_profiles_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profiles_dir = dir.into();
        self
    }

    /// Returns true when the required remote credentials are present.
    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.api_base.trim().is_empty()
    }
}
