//! End-to-end runner tests against the in-memory fake backend.
//!
//! These exercise the full path: runner -> manager -> agent -> backend,
//! including report emission, without touching the network.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use webrunner::client::FakeBackend;
use webrunner::runner::TestStatus;
use webrunner::{Config, ManagerError, TestRunner};

fn test_config(reports_dir: &TempDir) -> Arc<Config> {
    Arc::new(
        Config::default()
            .with_api_key("test-key")
            .with_poll_interval(Duration::from_millis(1))
            .with_reports_dir(reports_dir.path()),
    )
}

#[tokio::test]
async fn passing_suite_reports_all_passed() {
    let dir = TempDir::new().expect("tempdir");
    let backend = Arc::new(FakeBackend::finishing_with("OK: example.com loaded"));
    let mut runner = TestRunner::new(test_config(&dir), backend.clone());

    runner.register_test(
        "smoke",
        "Go to example.com and report the page title",
        |agent| async move {
            let output = agent.run().await?;
            anyhow::ensure!(output.contains("OK"), "unexpected output: {output}");
            Ok(())
        },
        vec!["smoke".to_string()],
    );
    runner.register_test(
        "search",
        "Search for rust on example.com",
        |agent| async move {
            agent.run().await?;
            Ok(())
        },
        vec![],
    );

    let results = runner
        .run_tests(None, None, false)
        .await
        .expect("run should succeed");

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.status == TestStatus::Passed));
    assert_eq!(backend.created_tasks().len(), 2);

    // One report artifact per run
    let reports: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read reports dir")
        .collect();
    assert_eq!(reports.len(), 1);
}

#[tokio::test]
async fn failed_task_produces_failed_result_with_detail() {
    let dir = TempDir::new().expect("tempdir");
    let backend = Arc::new(FakeBackend::failing_with("boom"));
    let mut runner = TestRunner::new(test_config(&dir), backend);

    runner.register_test(
        "crashy",
        "Do something that fails",
        |agent| async move {
            agent.run().await?;
            Ok(())
        },
        vec![],
    );

    let results = runner
        .run_tests(None, None, false)
        .await
        .expect("run should succeed");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, TestStatus::Failed);
    let message = results[0]
        .error_message
        .as_deref()
        .expect("failed result carries a message");
    assert!(message.contains("boom"), "message was: {message}");
}

#[tokio::test]
async fn tag_filter_skips_untagged_cases_entirely() {
    let dir = TempDir::new().expect("tempdir");
    let backend = Arc::new(FakeBackend::finishing_with("done"));
    let mut runner = TestRunner::new(test_config(&dir), backend.clone());

    runner.register_test(
        "tagged",
        "A smoke-tagged case",
        |agent| async move {
            agent.run().await?;
            Ok(())
        },
        vec!["smoke".to_string()],
    );
    runner.register_test(
        "untagged",
        "A case with no tags",
        |agent| async move {
            agent.run().await?;
            Ok(())
        },
        vec![],
    );

    let results = runner
        .run_tests(None, Some(&["smoke".to_string()]), false)
        .await
        .expect("run should succeed");

    assert_eq!(results.len(), 1);
    assert!(results[0].name.starts_with("tagged"));
    // The untagged case never created an agent or a cloud task.
    assert_eq!(backend.created_tasks().len(), 1);
}

#[tokio::test]
async fn parallel_run_executes_every_case_once() {
    let dir = TempDir::new().expect("tempdir");
    let backend = Arc::new(FakeBackend::finishing_with("done"));
    let config = Arc::new(
        Config::default()
            .with_api_key("test-key")
            .with_poll_interval(Duration::from_millis(1))
            .with_max_parallel(2)
            .with_reports_dir(dir.path()),
    );
    let mut runner = TestRunner::new(config, backend.clone());

    for i in 0..4 {
        runner.register_test(
            format!("case-{i}"),
            format!("Parallel case {i}"),
            |agent| async move {
                agent.run().await?;
                Ok(())
            },
            vec![],
        );
    }

    let results = runner
        .run_tests(None, None, true)
        .await
        .expect("run should succeed");

    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.status == TestStatus::Passed));
    assert_eq!(backend.created_tasks().len(), 4);
}

#[tokio::test]
async fn missing_api_key_is_fatal_before_any_test_runs() {
    let dir = TempDir::new().expect("tempdir");
    let backend = Arc::new(FakeBackend::finishing_with("done"));
    let config = Arc::new(Config::default().with_reports_dir(dir.path()));
    let mut runner = TestRunner::new(config, backend.clone());

    runner.register_test(
        "never-runs",
        "Should not execute",
        |agent| async move {
            agent.run().await?;
            Ok(())
        },
        vec![],
    );

    let err = runner
        .run_tests(None, None, false)
        .await
        .expect_err("missing key must fail the run");
    assert!(matches!(err, ManagerError::MissingApiKey));
    assert!(backend.created_tasks().is_empty());
}

#[tokio::test]
async fn results_accumulate_across_runs() {
    let dir = TempDir::new().expect("tempdir");
    let backend = Arc::new(FakeBackend::finishing_with("done"));
    let mut runner = TestRunner::new(test_config(&dir), backend);

    runner.register_test(
        "repeat",
        "Runs in both passes",
        |agent| async move {
            agent.run().await?;
            Ok(())
        },
        vec![],
    );

    let first = runner
        .run_tests(None, None, false)
        .await
        .expect("first run");
    assert_eq!(first.len(), 1);

    let second = runner
        .run_tests(None, None, false)
        .await
        .expect("second run");
    assert_eq!(second.len(), 2);
}

#[tokio::test]
async fn report_artifact_is_valid_json() {
    let dir = TempDir::new().expect("tempdir");
    let backend = Arc::new(FakeBackend::finishing_with("done"));
    let mut runner = TestRunner::new(test_config(&dir), backend);

    runner.register_test(
        "reported",
        "Leaves a report behind",
        |agent| async move {
            agent.run().await?;
            Ok(())
        },
        vec![],
    );
    runner
        .run_tests(None, None, false)
        .await
        .expect("run should succeed");

    let entry = std::fs::read_dir(dir.path())
        .expect("read reports dir")
        .next()
        .expect("one report written")
        .expect("dir entry");
    let raw = std::fs::read_to_string(entry.path()).expect("read report");
    let report: serde_json::Value = serde_json::from_str(&raw).expect("report parses");
    assert_eq!(report["summary"]["total"], 1);
    assert_eq!(report["summary"]["passed"], 1);
}
