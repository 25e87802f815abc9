//! Firestore request metrics.

use metrics::{counter, histogram};

pub mod names {
    /// Requests by operation and HTTP status.
    pub const REQUESTS_TOTAL: &str = "reelcut_firestore_requests_total";

    pub const RETRIES_TOTAL: &str = "reelcut_firestore_retries_total";

    pub const LATENCY_SECONDS: &str = "reelcut_firestore_latency_seconds";

    /// Committed and aborted transactions.
    pub const TRANSACTIONS_TOTAL: &str = "reelcut_firestore_transactions_total";
}

/// Record metrics for a completed Firestore request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

pub fn record_retry(operation: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}

pub fn record_transaction(outcome: &'static str) {
    counter!(names::TRANSACTIONS_TOTAL, "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_prefixed() {
        for name in [
            names::REQUESTS_TOTAL,
            names::RETRIES_TOTAL,
            names::LATENCY_SECONDS,
            names::TRANSACTIONS_TOTAL,
        ] {
            assert!(name.starts_with("reelcut_firestore_"));
        }
    }
}
