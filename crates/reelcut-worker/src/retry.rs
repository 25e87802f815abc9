//! Bounded retry with a per-attempt watchdog.
//!
//! The attempt budget counts every call including the first, and an attempt
//! cut off by the watchdog consumes budget like any other failure.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{WorkerError, WorkerResult};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Base delay between attempts (doubles each attempt).
    pub base_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
    /// Watchdog for a single attempt.
    pub attempt_timeout: Option<Duration>,
    /// Operation name for logging.
    pub operation_name: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            attempt_timeout: None,
            operation_name: "operation".to_string(),
        }
    }
}

impl RetryConfig {
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Delay before attempt `attempt + 1`, where `attempt` is 1-based.
    fn delay_after(&self, attempt: u32) -> Duration {
        let delay = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        delay.min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails with an error `should_retry` rejects,
/// or the attempt budget is spent. `op` receives the 1-based attempt number.
///
/// Returns the first success or the last error.
pub async fn retry_bounded<T, F, Fut, P>(config: &RetryConfig, should_retry: P, mut op: F) -> WorkerResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = WorkerResult<T>>,
    P: Fn(&WorkerError) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        let outcome = match config.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, op(attempt)).await {
                Ok(result) => result,
                Err(_) => Err(WorkerError::Timeout {
                    operation: config.operation_name.clone(),
                    secs: limit.as_secs(),
                }),
            },
            None => op(attempt).await,
        };

        match outcome {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = %config.operation_name, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt < max_attempts && should_retry(&e) => {
                let delay = config.delay_after(attempt);
                warn!(
                    operation = %config.operation_name,
                    attempt,
                    max_attempts,
                    "Attempt failed, retrying in {:?}: {}",
                    delay,
                    e
                );
                metrics::counter!(
                    "reelcut_worker_retries_total",
                    "operation" => config.operation_name.clone()
                )
                .increment(1);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(attempts: u32) -> RetryConfig {
        RetryConfig::new("test")
            .with_max_attempts(attempts)
            .with_base_delay(Duration::ZERO)
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let config = RetryConfig::new("test").with_base_delay(Duration::from_millis(100));
        assert_eq!(config.delay_after(1), Duration::from_millis(100));
        assert_eq!(config.delay_after(2), Duration::from_millis(200));
        assert_eq!(config.delay_after(3), Duration::from_millis(400));

        let capped = RetryConfig::new("test").with_base_delay(Duration::from_secs(8));
        assert_eq!(capped.delay_after(5), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_never_exceeds_budget() {
        let calls = AtomicU32::new(0);
        let result: WorkerResult<()> = retry_bounded(&fast(2), |_| true, |_| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(WorkerError::validation("inverted"))
        })
        .await;

        assert!(matches!(result, Err(WorkerError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_returns_first_success() {
        let calls = AtomicU32::new(0);
        let result = retry_bounded(&fast(5), |_| true, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(WorkerError::validation("bad"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: WorkerResult<()> = retry_bounded(
            &fast(3),
            |e| e.is_selection_retryable(),
            |_| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(WorkerError::config_error("missing key"))
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_attempt() {
        let calls = AtomicU32::new(0);
        let config = fast(2).with_attempt_timeout(Duration::from_millis(20));
        let result = retry_bounded(&config, |_| true, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 1 {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timeout_on_last_attempt_surfaces() {
        let config = fast(1).with_attempt_timeout(Duration::from_millis(10));
        let result: WorkerResult<()> = retry_bounded(&config, |_| true, |_| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(WorkerError::Timeout { .. })));
    }
}
