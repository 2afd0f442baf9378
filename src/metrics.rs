//! Prometheus metrics for the relay.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::error::ServerError;

/// How a relay stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Upstream finished and every output chunk was handed to the caller.
    Completed,
    /// Upstream read failed; the response was aborted.
    UpstreamFailed,
    /// Caller went away; upstream was released.
    ClientDisconnected,
    /// Server shutdown interrupted the stream.
    Shutdown,
}

impl StreamOutcome {
    /// Convert to static string for metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamOutcome::Completed => "completed",
            StreamOutcome::UpstreamFailed => "upstream_failed",
            StreamOutcome::ClientDisconnected => "client_disconnected",
            StreamOutcome::Shutdown => "shutdown",
        }
    }
}

/// Initialize metrics descriptions.
pub fn init_metrics() {
    describe_counter!("relay_requests_total", "Relay requests received");
    describe_counter!(
        "relay_requests_rejected_total",
        "Requests rejected before streaming started"
    );
    describe_gauge!("relay_active_streams", "Currently active relay streams");

    // Upstream metrics
    describe_counter!("relay_upstream_requests_total", "Upstream generation calls");
    describe_counter!("relay_upstream_errors_total", "Upstream generation call failures");
    describe_histogram!(
        "relay_upstream_ttfb_seconds",
        "Time from upstream call to first upstream byte"
    );

    // Streaming metrics
    describe_counter!("relay_chunks_forwarded_total", "Output chunks written to callers");
    describe_counter!("relay_bytes_forwarded_total", "Output bytes written to callers");
    describe_counter!(
        "relay_malformed_events_total",
        "Upstream data lines dropped because they were not valid JSON"
    );
    describe_counter!("relay_streams_finished_total", "Relay streams by outcome");
    describe_histogram!("relay_stream_duration_seconds", "Total relay stream duration");
}

/// Start the Prometheus metrics HTTP server.
pub fn start_metrics_server(addr: SocketAddr) -> Result<(), ServerError> {
    // Stream duration: 10ms to ~163s (exponential, base 0.01, factor 2)
    let duration_buckets: [f64; 15] = [
        0.01, 0.02, 0.04, 0.08, 0.16, 0.32, 0.64, 1.28, 2.56, 5.12, 10.24, 20.48, 40.96, 81.92,
        163.84,
    ];

    // Upstream TTFB: 1ms to ~16s (exponential, base 0.001, factor 2)
    let ttfb_buckets: [f64; 15] = [
        0.001, 0.002, 0.004, 0.008, 0.016, 0.032, 0.064, 0.128, 0.256, 0.512, 1.024, 2.048, 4.096,
        8.192, 16.384,
    ];

    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("relay_stream_duration_seconds".to_string()),
            &duration_buckets,
        )
        .and_then(|b| {
            b.set_buckets_for_metric(
                Matcher::Full("relay_upstream_ttfb_seconds".to_string()),
                &ttfb_buckets,
            )
        })
        .map_err(|e| ServerError::Config(format!("Invalid histogram buckets: {}", e)))?
        .with_http_listener(addr)
        .install()
        .map_err(|e| ServerError::Bind(format!("Failed to start metrics server: {}", e)))?;

    tracing::info!(%addr, "Metrics server started");
    Ok(())
}

/// Record an incoming relay request.
pub fn record_request(operation: &'static str) {
    counter!("relay_requests_total", "operation" => operation).increment(1);
}

/// Record a request rejected before any output was sent.
pub fn record_rejected(operation: &'static str, reason: &'static str) {
    counter!("relay_requests_rejected_total", "operation" => operation, "reason" => reason)
        .increment(1);
}

/// Update active stream gauge.
pub fn set_active_streams(count: u64) {
    gauge!("relay_active_streams").set(count as f64);
}

/// Record an upstream call.
pub fn record_upstream_request(backend: &'static str) {
    counter!("relay_upstream_requests_total", "backend" => backend).increment(1);
}

/// Record a failed upstream call.
pub fn record_upstream_error(backend: &'static str, kind: &'static str) {
    counter!("relay_upstream_errors_total", "backend" => backend, "kind" => kind).increment(1);
}

/// Record time to first upstream byte.
pub fn record_upstream_ttfb(backend: &'static str, duration: Duration) {
    histogram!("relay_upstream_ttfb_seconds", "backend" => backend).record(duration.as_secs_f64());
}

/// Record a chunk written to the caller.
pub fn record_chunk_forwarded(bytes: u64) {
    counter!("relay_chunks_forwarded_total").increment(1);
    counter!("relay_bytes_forwarded_total").increment(bytes);
}

/// Record dropped malformed events.
pub fn record_malformed_events(operation: &'static str, count: u64) {
    if count > 0 {
        counter!("relay_malformed_events_total", "operation" => operation).increment(count);
    }
}

/// Record the end of a relay stream.
pub fn record_stream_finished(operation: &'static str, outcome: StreamOutcome, duration: Duration) {
    counter!(
        "relay_streams_finished_total",
        "operation" => operation,
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!("relay_stream_duration_seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}

/// Timer for measuring durations.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
