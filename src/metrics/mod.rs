use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

// Lookup metrics
pub const LOOKUP_ATTEMPTS_TOTAL: &str = "ip_lookup_attempts_total";
pub const LOOKUP_ERRORS_TOTAL: &str = "ip_lookup_errors_total";
pub const LOOKUP_DURATION_SECONDS: &str = "ip_lookup_duration_seconds";
pub const LOOKUP_STALE_DISCARDS_TOTAL: &str = "ip_lookup_stale_discards_total";

// Input validation metrics
pub const VALIDATION_FAILURES_TOTAL: &str = "ip_validation_failures_total";

// Row and clock metrics
pub const ROWS_ACTIVE: &str = "rows_active";
pub const CLOCK_RESTARTS_TOTAL: &str = "clock_restarts_total";

pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix(LOOKUP_DURATION_SECONDS.to_string()),
            &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )
        .unwrap()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

pub fn record_lookup_attempt(status: &str) {
    counter!(LOOKUP_ATTEMPTS_TOTAL, "status" => status.to_string()).increment(1);
}

pub fn record_lookup_error(error_type: &str) {
    counter!(LOOKUP_ERRORS_TOTAL, "error_type" => error_type.to_string()).increment(1);
}

pub fn record_lookup_duration(duration: Duration) {
    histogram!(LOOKUP_DURATION_SECONDS).record(duration.as_secs_f64());
}

pub fn record_stale_discard() {
    counter!(LOOKUP_STALE_DISCARDS_TOTAL).increment(1);
}

pub fn record_validation_failure(reason: &str) {
    counter!(VALIDATION_FAILURES_TOTAL, "reason" => reason.to_string()).increment(1);
}

pub fn update_active_rows(count: usize) {
    gauge!(ROWS_ACTIVE).set(count as f64);
}

pub fn record_clock_restart() {
    counter!(CLOCK_RESTARTS_TOTAL).increment(1);
}
