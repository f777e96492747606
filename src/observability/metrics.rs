//! Metrics collection and exposition.
//!
//! # Metrics
//! - `echo_requests_total` (counter): echoed requests by method, uri, protocol
//! - `http_server_requests_seconds` (histogram): echo latency, same labels
//!
//! # Design Decisions
//! - One global Prometheus recorder, installed by the binary
//! - Probe and scrape requests are not counted

use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

pub const REQUESTS_TOTAL: &str = "echo_requests_total";
pub const REQUEST_DURATION: &str = "http_server_requests_seconds";

/// Latency buckets in seconds.
const DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), DURATION_BUCKETS)
}

/// Install the global recorder and return the handle the scrape endpoint
/// renders from.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = builder()?.install_recorder()?;
    ::metrics::describe_counter!(REQUESTS_TOTAL, "Total number of echoed requests");
    ::metrics::describe_histogram!(REQUEST_DURATION, ::metrics::Unit::Seconds, "Echo request latency");
    Ok(handle)
}

/// Record one echoed request.
pub fn record_request(method: &str, uri: &str, protocol: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("uri", uri.to_string()),
        ("protocol", protocol.to_string()),
    ];
    ::metrics::counter!(REQUESTS_TOTAL, &labels).increment(1);
    ::metrics::histogram!(REQUEST_DURATION, &labels).record(start.elapsed().as_secs_f64());
}
