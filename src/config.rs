//! Configuration loading from TOML files and environment variables.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::ServerError;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub auth: AuthConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the relay listens on.
    pub listen_addr: String,

    /// Maximum concurrent relay streams.
    pub max_streams: usize,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,

    /// Graceful shutdown timeout (seconds).
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3100".to_string(),
            max_streams: 1024,
            max_body_bytes: 256 * 1024,
            shutdown_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Upstream generation backend configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Backend provider: "http" or "mock".
    pub provider: String,

    /// Base URL of the generation backend (BACKEND_URL).
    pub base_url: String,

    /// Connect timeout (seconds).
    pub connect_timeout_secs: u64,

    /// Overall request timeout (seconds). 0 disables it, which is the
    /// default because generation streams are long-lived.
    pub timeout_secs: u64,

    /// Maximum idle connections per host in pool.
    pub pool_max_idle_per_host: usize,

    /// Skip TLS certificate verification (testing only).
    pub insecure_ssl: bool,

    /// Delay between chunks for the mock provider (milliseconds).
    pub mock_chunk_delay_ms: u64,

    pub http2: Http2Config,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            provider: "http".to_string(),
            base_url: "http://127.0.0.1:8000".to_string(),
            connect_timeout_secs: 10,
            timeout_secs: 0,
            pool_max_idle_per_host: 32,
            insecure_ssl: false,
            mock_chunk_delay_ms: 50,
            http2: Http2Config::default(),
        }
    }
}

impl UpstreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn mock_chunk_delay(&self) -> Duration {
        Duration::from_millis(self.mock_chunk_delay_ms)
    }
}

/// HTTP/2 tuning for the upstream client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Http2Config {
    /// Use HTTP/2 for upstream requests. Plaintext endpoints use prior
    /// knowledge (h2c), TLS endpoints negotiate via ALPN.
    pub enabled: bool,

    pub initial_stream_window_kb: u32,
    pub initial_connection_window_kb: u32,
    pub adaptive_window: bool,

    /// Keep-alive ping interval (seconds). 0 disables pings.
    pub keep_alive_interval_secs: u64,
    pub keep_alive_timeout_secs: u64,
}

impl Default for Http2Config {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_stream_window_kb: 256,
            initial_connection_window_kb: 1024,
            adaptive_window: true,
            keep_alive_interval_secs: 20,
            keep_alive_timeout_secs: 10,
        }
    }
}

/// Caller authentication configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Accepted session tokens. Empty rejects every caller.
    pub tokens: Vec<String>,

    /// Cookie carrying the session token.
    pub cookie_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            tokens: Vec::new(),
            cookie_name: "session_token".to_string(),
        }
    }
}

/// Metrics/Prometheus configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint.
    pub enabled: bool,

    /// Listen address for metrics server.
    pub listen_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "warn").
    pub level: String,

    /// Output format: "pretty" or "json".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ServerError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        toml::from_str(&content)
            .map_err(|e| ServerError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from file, then apply environment variable overrides.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, ServerError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ServerError> {
        let base = self.upstream.base_url.as_str();
        if self.upstream.provider == "http"
            && !(base.starts_with("http://") || base.starts_with("https://"))
        {
            return Err(ServerError::Config(format!(
                "upstream.base_url must start with http:// or https://, got {:?}",
                base
            )));
        }
        if self.server.max_streams == 0 {
            return Err(ServerError::Config(
                "server.max_streams must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides.
    ///
    /// The lookup is injected so tests do not have to mutate process state.
    pub fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(v) = var("RELAY_LISTEN_ADDR") {
            self.server.listen_addr = v;
        }
        if let Some(n) = var("RELAY_MAX_STREAMS").and_then(|v| v.parse().ok()) {
            self.server.max_streams = n;
        }

        // Upstream overrides
        if let Some(v) = var("BACKEND_URL") {
            self.upstream.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = var("RELAY_BACKEND_PROVIDER") {
            self.upstream.provider = v;
        }
        if let Some(n) = var("RELAY_UPSTREAM_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.upstream.timeout_secs = n;
        }

        // Auth overrides (comma separated)
        if let Some(v) = var("RELAY_AUTH_TOKENS") {
            self.auth.tokens = v
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
        }

        // Metrics overrides
        if let Some(v) = var("RELAY_METRICS_ENABLED") {
            self.metrics.enabled = v == "true" || v == "1";
        }
        if let Some(v) = var("RELAY_METRICS_ADDR") {
            self.metrics.listen_addr = v;
        }

        // Logging overrides
        if let Some(v) = var("RELAY_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = var("RELAY_LOG_FORMAT") {
            self.logging.format = v;
        }
    }
}
