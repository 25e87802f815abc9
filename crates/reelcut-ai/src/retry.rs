//! Retry for idempotent service calls.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::error::AiResult;

/// Run `op`, retrying transient failures with 500ms * 2^n backoff.
///
/// Also records call count and latency per service.
pub async fn with_retry<T, F, Fut>(service: &'static str, max_retries: u32, op: F) -> AiResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = AiResult<T>>,
{
    let started = Instant::now();
    let mut attempt = 0u32;
    let result = loop {
        match op().await {
            Err(e) if e.is_retryable() && attempt < max_retries => {
                let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                warn!(
                    service,
                    attempt = attempt + 1,
                    "Request failed, retrying in {:?}: {}",
                    delay,
                    e
                );
                metrics::counter!("reelcut_ai_retries_total", "service" => service).increment(1);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => break other,
        }
    };

    record_call(service, result.is_ok(), started);
    result
}

pub(crate) fn record_call(service: &'static str, ok: bool, started: Instant) {
    let outcome = if ok { "success" } else { "error" };
    metrics::counter!("reelcut_ai_requests_total", "service" => service, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("reelcut_ai_request_duration_seconds", "service" => service)
        .record(started.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AiError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_only_transient_errors() {
        let calls = AtomicU32::new(0);
        let result: AiResult<()> = with_retry("shots", 2, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AiError::invalid_response("shots", "bad json"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_budget() {
        let calls = AtomicU32::new(0);
        let result: AiResult<()> = with_retry("shots", 2, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AiError::Http {
                service: "shots",
                status: 502,
                body: String::new(),
            })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
