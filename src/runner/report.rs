//! Test results and the JSON report artifact.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ReportError;

/// Outcome of one executed test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// The recorded outcome of executing one test case once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    /// Unique run name: the case name plus a uniqueness token.
    pub name: String,
    /// Pass/fail/skip verdict.
    pub status: TestStatus,
    /// Wall-clock duration from agent creation through teardown.
    pub duration: Duration,
    /// Error detail for failed tests.
    pub error_message: Option<String>,
    /// Screenshot saved for this test, if any.
    pub screenshot_path: Option<String>,
}

impl TestResult {
    /// Creates a passed result.
    pub fn passed(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Passed,
            duration,
            error_message: None,
            screenshot_path: None,
        }
    }

    /// Creates a failed result carrying the error detail.
    pub fn failed(name: impl Into<String>, duration: Duration, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Failed,
            duration,
            error_message: Some(error.into()),
            screenshot_path: None,
        }
    }

    /// Attaches a screenshot path.
    pub fn with_screenshot(mut self, path: impl Into<String>) -> Self {
        self.screenshot_path = Some(path.into());
        self
    }
}

/// Aggregate counts over a result list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Percentage of passed tests over all recorded tests.
    pub success_rate: f64,
    pub total_duration_secs: f64,
    pub generated_at: DateTime<Utc>,
}

impl ReportSummary {
    /// Computes summary counts from a result list.
    pub fn from_results(results: &[TestResult]) -> Self {
        let total = results.len();
        let passed = results
            .iter()
            .filter(|r| r.status == TestStatus::Passed)
            .count();
        let failed = results
            .iter()
            .filter(|r| r.status == TestStatus::Failed)
            .count();
        let skipped = results
            .iter()
            .filter(|r| r.status == TestStatus::Skipped)
            .count();
        let success_rate = if total > 0 {
            (passed as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let total_duration_secs = results.iter().map(|r| r.duration.as_secs_f64()).sum();

        Self {
            total,
            passed,
            failed,
            skipped,
            success_rate,
            total_duration_secs,
            generated_at: Utc::now(),
        }
    }
}

/// The full report artifact written after each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub summary: ReportSummary,
    pub results: Vec<TestResult>,
}

/// Serializes aggregated results into a JSON report file.
pub struct Reporter {
    reports_dir: PathBuf,
}

impl Reporter {
    /// Creates a reporter writing under the given directory.
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    /// Writes `test_report_{ts}.json` and logs the summary. Returns the
    /// report path.
    pub fn write(&self, results: &[TestResult]) -> Result<PathBuf, ReportError> {
        let summary = ReportSummary::from_results(results);
        let report = Report {
            summary,
            results: results.to_vec(),
        };

        fs::create_dir_all(&self.reports_dir)?;
        let path = self
            .reports_dir
            .join(format!("test_report_{}.json", Utc::now().timestamp_millis()));
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(&path, json)?;

        log_summary(&report.summary, &path);
        Ok(path)
    }
}

fn log_summary(summary: &ReportSummary, path: &Path) {
    info!(
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        success_rate = format!("{:.1}%", summary.success_rate),
        duration = format!("{:.2}s", summary.total_duration_secs),
        report = %path.display(),
        "test summary"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_summary_counts() {
        let results = vec![
            TestResult::passed("a", Duration::from_secs(1)),
            TestResult::passed("b", Duration::from_secs(2)),
            TestResult::failed("c", Duration::from_secs(3), "boom"),
        ];
        let summary = ReportSummary::from_results(&results);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 0);
        assert!((summary.success_rate - 66.666).abs() < 0.01);
        assert!((summary.total_duration_secs - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_of_empty_results() {
        let summary = ReportSummary::from_results(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.success_rate, 0.0);
    }

    #[test]
    fn test_reporter_writes_readable_report() {
        let temp = TempDir::new().unwrap();
        let reporter = Reporter::new(temp.path());

        let results = vec![
            TestResult::passed("login_1", Duration::from_millis(1200)),
            TestResult::failed("search_1", Duration::from_millis(800), "assertion failed"),
        ];
        let path = reporter.write(&results).unwrap();
        assert!(path.exists());

        let report: Report =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[0].name, "login_1");
        assert_eq!(report.results[1].status, TestStatus::Failed);
        assert_eq!(
            report.results[1].error_message.as_deref(),
            Some("assertion failed")
        );
    }
}
