//! Prometheus metrics for the callback engine.
//!
//! Counters cover the full task lifecycle: scheduled, delivered, retried,
//! failed, skipped, plus report-call failures. The serving layer is expected
//! to expose them from its own metrics endpoint via [`encode_metrics`].

use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter,
    IntCounterVec, TextEncoder};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "sr";

lazy_static! {
    /// Callback tasks accepted by the scheduler
    pub static ref CALLBACKS_SCHEDULED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_callbacks_scheduled_total", METRIC_PREFIX),
        "Callback tasks accepted by the scheduler"
    ).unwrap();

    /// Callbacks delivered successfully, by channel
    pub static ref CALLBACKS_DELIVERED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_callbacks_delivered_total", METRIC_PREFIX),
        "Callbacks delivered successfully",
        &["channel"]
    ).unwrap();

    /// Retry attempts made after retryable failures
    pub static ref CALLBACKS_RETRIED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_callbacks_retried_total", METRIC_PREFIX),
        "Retry attempts made after retryable delivery failures"
    ).unwrap();

    /// Callbacks that ended in a terminal failure, by channel
    pub static ref CALLBACKS_FAILED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_callbacks_failed_total", METRIC_PREFIX),
        "Callbacks that ended in a terminal failure",
        &["channel"]
    ).unwrap();

    /// Declarations skipped because their destination resolved to null
    pub static ref CALLBACKS_SKIPPED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_callbacks_skipped_total", METRIC_PREFIX),
        "Declarations skipped because their destination resolved to null"
    ).unwrap();

    /// Failures of the post-delivery observability report
    pub static ref REPORT_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_report_failures_total", METRIC_PREFIX),
        "Failures of the post-delivery observability report"
    ).unwrap();
}

/// Encode all registered metrics in Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let before = CALLBACKS_SCHEDULED_TOTAL.get();
        CALLBACKS_SCHEDULED_TOTAL.inc();
        assert_eq!(CALLBACKS_SCHEDULED_TOTAL.get(), before + 1);
    }

    #[test]
    fn encode_produces_text() {
        CALLBACKS_SKIPPED_TOTAL.inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("sr_callbacks_skipped_total"));
    }
}
