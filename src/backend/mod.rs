//! Generation backends the relay forwards to.

mod client;
mod http;
mod mock;
mod traits;

pub use client::build_streaming_client;
pub use http::{extract_error_message, HttpBackend};
pub use mock::MockBackend;
pub use traits::{scripted_stream, ByteStream, GenerationBackend, UpstreamRequest};

use std::sync::Arc;

use crate::config::UpstreamConfig;
use crate::error::RelayError;

/// Create a backend from configuration.
pub fn create_backend(config: &UpstreamConfig) -> Result<Arc<dyn GenerationBackend>, RelayError> {
    match config.provider.as_str() {
        "mock" => Ok(Arc::new(MockBackend::with_delay(config.mock_chunk_delay()))),
        "http" => {
            let client = build_streaming_client(config)?;
            Ok(Arc::new(HttpBackend::new(client, config.base_url.clone())))
        }
        other => Err(RelayError::Config(format!(
            "Unknown backend provider: {}. Available: http, mock",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_backend_by_provider() {
        let mut config = UpstreamConfig::default();
        assert_eq!(create_backend(&config).unwrap().name(), "http");

        config.provider = "mock".to_string();
        assert_eq!(create_backend(&config).unwrap().name(), "mock");

        config.provider = "grpc".to_string();
        assert!(matches!(create_backend(&config), Err(RelayError::Config(_))));
    }
}
