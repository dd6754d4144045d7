//! Small shared helpers.

use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::warn;

/// Retries an async operation with exponential backoff.
///
/// This is a caller-level utility; the runner never retries failed
/// remote tasks on its own. `max_retries` counts retries beyond the
/// first attempt, so `max_retries = 2` allows three attempts total.
pub async fn retry<T, E, F, Fut>(
    max_retries: usize,
    initial_delay: Duration,
    backoff: f64,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = initial_delay;
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_retries => {
                attempt += 1;
                warn!(attempt, error = %e, "operation failed, retrying");
                tokio::time::sleep(delay).await;
                delay = delay.mul_f64(backoff);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Formats a duration as `1.2s`, `3m 4.5s` or `1h 2m 3.0s`.
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs_f64();
    if seconds < 60.0 {
        format!("{seconds:.1}s")
    } else if seconds < 3600.0 {
        let minutes = (seconds / 60.0) as u64;
        format!("{}m {:.1}s", minutes, seconds % 60.0)
    } else {
        let hours = (seconds / 3600.0) as u64;
        let minutes = ((seconds % 3600.0) / 60.0) as u64;
        format!("{}h {}m {:.1}s", hours, minutes, seconds % 60.0)
    }
}

/// Replaces filesystem-hostile characters with underscores and collapses
/// runs of underscores.
pub fn sanitize_filename(name: &str) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    static COLLAPSE: OnceLock<Regex> = OnceLock::new();

    let invalid = INVALID.get_or_init(|| {
        Regex::new(r#"[<>:"/\\|?*\s]"#).expect("invalid-character pattern must compile")
    });
    let collapse =
        COLLAPSE.get_or_init(|| Regex::new(r"_+").expect("collapse pattern must compile"));

    let replaced = invalid.replace_all(name, "_");
    let collapsed = collapse.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches('_');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<u32, String> =
            retry(3, Duration::from_millis(1), 2.0, move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("not yet".to_string())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(42));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<u32, String> =
            retry(2, Duration::from_millis(1), 2.0, move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("always".to_string())
                }
            })
            .await;

        assert!(result.is_err());
        // One initial attempt plus two retries.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30.0s");
        assert_eq!(format_duration(Duration::from_secs(3723)), "1h 2m 3.0s");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("login test: smoke/1"), "login_test_smoke_1");
        assert_eq!(sanitize_filename("///"), "unnamed");
        assert_eq!(sanitize_filename("already_clean"), "already_clean");
    }
}
