//! Gateway metrics.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): attempts by method and outcome
//! - `gateway_request_duration_seconds` (histogram): per-attempt latency
//! - `gateway_cold_start_retries_total` (counter): retries by attempt number
//! - `gateway_token_refresh_total` (counter): refreshes by outcome

use std::time::Instant;

/// Record one attempt. `status` is the HTTP status, or `None` when no response arrived.
pub fn record_attempt(method: &str, status: Option<u16>, start: Instant) {
    let outcome = status.map_or_else(|| "no_response".to_string(), |s| s.to_string());
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => outcome
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cold_start_retry(attempt: u32) {
    metrics::counter!("gateway_cold_start_retries_total", "attempt" => attempt.to_string())
        .increment(1);
}

/// `outcome` is one of "success", "failure", "missing".
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("gateway_token_refresh_total", "outcome" => outcome).increment(1);
}
