//! Backend trait definitions.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use std::time::Duration;

use crate::error::RelayError;

/// Raw upstream response body, in network-chunk order.
pub type ByteStream = BoxStream<'static, Result<Bytes, RelayError>>;

/// A generation service that answers with an SSE byte stream.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Get the backend name for metrics/logging.
    fn name(&self) -> &'static str;

    /// Issue one streaming generation call.
    ///
    /// Resolves once response headers are in. A non-success status is
    /// reported as [`RelayError::Upstream`]; the body is never retried.
    async fn open_stream(&self, request: UpstreamRequest) -> Result<ByteStream, RelayError>;

    /// Health check for the backend.
    async fn health_check(&self) -> Result<(), RelayError>;
}

/// A prepared upstream call.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    /// Operation name, for logging.
    pub operation: &'static str,
    /// Path below the backend base URL, e.g. `/api/v1/exam/generate`.
    pub path: &'static str,
    /// Snake-case payload.
    pub payload: Value,
    /// Request ID for correlation.
    pub request_id: String,
}

/// Byte stream over canned chunks, optionally paced.
pub fn scripted_stream(
    chunks: Vec<Result<Bytes, RelayError>>,
    delay: Option<Duration>,
) -> ByteStream {
    stream::iter(chunks)
        .then(move |chunk| async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            chunk
        })
        .boxed()
}
