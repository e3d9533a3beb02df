use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry, Encoder,
    HistogramVec, IntCounterVec, Registry, TextEncoder,
};
use std::time::Instant;

use crate::TsdbError;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref REQUEST_COUNTER: IntCounterVec = register_int_counter_vec_with_registry!(
        "tsdb_client_requests_total",
        "Total number of requests sent to the TSDB",
        &["endpoint"],
        REGISTRY
    ).unwrap();

    pub static ref REQUEST_ERRORS: IntCounterVec = register_int_counter_vec_with_registry!(
        "tsdb_client_request_errors_total",
        "Total number of failed TSDB requests by error kind",
        &["endpoint", "kind"],
        REGISTRY
    ).unwrap();

    pub static ref REQUEST_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        "tsdb_client_request_duration_seconds",
        "TSDB request duration in seconds",
        &["endpoint"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0],
        REGISTRY
    ).unwrap();
}

/// Counts a request on creation and records its duration when dropped.
pub struct RequestTimer {
    endpoint: &'static str,
    start: Instant,
}

impl RequestTimer {
    pub fn new(endpoint: &'static str) -> Self {
        REQUEST_COUNTER.with_label_values(&[endpoint]).inc();
        Self {
            endpoint,
            start: Instant::now(),
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        REQUEST_DURATION
            .with_label_values(&[self.endpoint])
            .observe(duration);
    }
}

pub fn record_error(endpoint: &'static str, err: &TsdbError) {
    REQUEST_ERRORS
        .with_label_values(&[endpoint, err.kind()])
        .inc();
}

/// Text exposition of the client metrics.
pub fn gather() -> prometheus::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to encode metrics: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_counts_and_observes() {
        let before = REQUEST_COUNTER.with_label_values(&["test"]).get();
        {
            let _timer = RequestTimer::new("test");
        }
        assert_eq!(REQUEST_COUNTER.with_label_values(&["test"]).get(), before + 1);
        assert!(REQUEST_DURATION.with_label_values(&["test"]).get_sample_count() >= 1);
    }

    #[test]
    fn test_gather_includes_errors() {
        record_error("test", &TsdbError::Canceled);
        let text = gather().unwrap();
        assert!(text.contains("tsdb_client_request_errors_total"));
        assert!(text.contains("kind=\"canceled\""));
    }
}
