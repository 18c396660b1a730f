//! Dispatch-pipeline metrics: message claims, deliveries, retries and
//! dead-letters, plus the timers around a drain pass and a webhook call.

use metrics::{counter, gauge, histogram};

/// Metrics recorder for the delivery and retry pipelines.
pub struct DispatchMetrics;

impl DispatchMetrics {
    pub fn record_claimed(pipeline: &str, count: usize) {
        counter!("dispatch_messages_claimed_total", "pipeline" => pipeline.to_string())
            .increment(count as u64);
    }

    pub fn record_delivered(pipeline: &str) {
        counter!("dispatch_messages_delivered_total", "pipeline" => pipeline.to_string()).increment(1);
    }

    pub fn record_retried(pipeline: &str) {
        counter!("dispatch_messages_retried_total", "pipeline" => pipeline.to_string()).increment(1);
    }

    pub fn record_dead_lettered() {
        counter!("dispatch_messages_dead_lettered_total").increment(1);
    }

    pub fn record_drain_duration(pipeline: &str, duration_secs: f64) {
        histogram!("dispatch_drain_duration_seconds", "pipeline" => pipeline.to_string())
            .record(duration_secs);
    }

    pub fn record_webhook_duration(duration_secs: f64) {
        histogram!("dispatch_webhook_duration_seconds").record(duration_secs);
    }

    pub fn set_pending_retries(count: u64) {
        gauge!("dispatch_pending_retries").set(count as f64);
    }
}

pub(crate) fn describe() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        "dispatch_messages_claimed_total",
        "Messages claimed from the store by pipeline"
    );
    describe_counter!(
        "dispatch_messages_delivered_total",
        "Messages successfully delivered by pipeline"
    );
    describe_counter!(
        "dispatch_messages_retried_total",
        "Messages re-queued for retry by pipeline"
    );
    describe_counter!(
        "dispatch_messages_dead_lettered_total",
        "Messages moved to the dead-letter table"
    );
    describe_histogram!(
        "dispatch_drain_duration_seconds",
        "Duration of a single drain pass by pipeline"
    );
    describe_histogram!(
        "dispatch_webhook_duration_seconds",
        "Duration of an outbound webhook POST"
    );
    describe_gauge!(
        "dispatch_pending_retries",
        "Retry rows observed below the max-retry threshold as of the last drain"
    );
}
