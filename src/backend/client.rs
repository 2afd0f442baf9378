//! Shared HTTP client builder for the generation backend.
//!
//! Configures a reqwest Client for long-lived SSE responses, with optional
//! HTTP/2 multiplexing.

use reqwest::Client;
use std::time::Duration;

use crate::config::UpstreamConfig;
use crate::error::RelayError;

/// Build an HTTP client configured for SSE streaming.
///
/// No overall request timeout is applied unless `timeout_secs` is set: a
/// generation stream can legitimately run for minutes, and reqwest's timeout
/// covers the whole body. Only the connect phase is bounded by default.
pub fn build_streaming_client(config: &UpstreamConfig) -> Result<Client, RelayError> {
    let http2 = &config.http2;

    let mut builder = Client::builder()
        .connect_timeout(config.connect_timeout())
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60));

    if let Some(timeout) = config.timeout() {
        builder = builder.timeout(timeout);
    }

    // Allow insecure TLS connections (for testing with self-signed certificates)
    if config.insecure_ssl {
        builder = builder.danger_accept_invalid_certs(true);
        tracing::warn!("TLS certificate verification disabled (insecure_ssl=true)");
    }

    if http2.enabled {
        if config.base_url.starts_with("http://") {
            // Plaintext: skip upgrade negotiation and speak h2c directly.
            builder = builder.http2_prior_knowledge();
            tracing::info!("HTTP/2 with prior knowledge (h2c) enabled for plaintext endpoint");
        } else {
            // TLS: let ALPN negotiate h2.
            tracing::info!("HTTP/2 via ALPN negotiation enabled for TLS endpoint");
        }

        if http2.keep_alive_interval_secs > 0 {
            builder = builder
                .http2_keep_alive_interval(Duration::from_secs(http2.keep_alive_interval_secs))
                .http2_keep_alive_timeout(Duration::from_secs(http2.keep_alive_timeout_secs))
                .http2_keep_alive_while_idle(true);
        }

        builder = builder
            .http2_initial_stream_window_size(http2.initial_stream_window_kb * 1024)
            .http2_initial_connection_window_size(http2.initial_connection_window_kb * 1024);

        if http2.adaptive_window {
            builder = builder.http2_adaptive_window(true);
        }

        tracing::info!(
            stream_window_kb = http2.initial_stream_window_kb,
            conn_window_kb = http2.initial_connection_window_kb,
            h2_keepalive_secs = http2.keep_alive_interval_secs,
            adaptive_window = http2.adaptive_window,
            "HTTP/2 flow control configured"
        );
    } else {
        builder = builder.http1_only();
        tracing::info!("HTTP/1.1 mode (HTTP/2 disabled)");
    }

    builder
        .build()
        .map_err(|e| RelayError::Config(format!("Failed to build HTTP client: {}", e)))
}
