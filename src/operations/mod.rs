//! Generation operations the relay exposes.
//!
//! Each operation pairs a camelCase inbound request with the snake_case
//! payload the backend expects. The rename table lives in the serde
//! attributes of the two structs and must not drift from the backend's.

mod assessment;
mod content;
mod exam;
mod fields;
mod media;

pub use assessment::{AssessmentGeneration, AssessmentPayload};
pub use content::{ContentGeneration, ContentKind, ContentPayload};
pub use exam::{ExamGeneration, ExamPayload};
pub use media::{ComicGeneration, ComicPayload, VideoScript, VideoScriptPayload};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::RelayError;
use crate::streaming::LinePolicy;

pub const TEXT_EVENT_STREAM: &str = "text/event-stream";
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// A single generation endpoint.
pub trait GenerationOperation: DeserializeOwned + Send + 'static {
    /// Payload sent upstream.
    type Payload: Serialize;

    /// Operation name used in logs and metrics.
    const NAME: &'static str;

    /// Content-Type of the success response.
    const CONTENT_TYPE: &'static str = TEXT_PLAIN_UTF8;

    /// How upstream non-data lines are treated.
    const LINE_POLICY: LinePolicy = LinePolicy::ContentOnly;

    /// Check required fields and value constraints.
    fn validate(&self) -> Result<(), RelayError>;

    /// Upstream path below the backend base URL.
    fn upstream_path(&self) -> Result<&'static str, RelayError>;

    /// Convert into the upstream payload. Only called after `validate`.
    fn into_payload(self) -> Self::Payload;
}

/// A validated request ready to be sent upstream.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub operation: &'static str,
    pub path: &'static str,
    pub payload: Value,
    pub content_type: &'static str,
    pub policy: LinePolicy,
}

/// Decode, validate and map an inbound body for operation `O`.
pub fn prepare<O: GenerationOperation>(body: &[u8]) -> Result<PreparedRequest, RelayError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| RelayError::Validation(format!("Invalid JSON body: {}", e)))?;

    if !value.is_object() {
        return Err(RelayError::Validation(
            "Request body must be a JSON object".to_string(),
        ));
    }

    let request: O = serde_json::from_value(value)
        .map_err(|e| RelayError::Validation(format!("Invalid request: {}", e)))?;

    request.validate()?;
    let path = request.upstream_path()?;

    let payload = serde_json::to_value(request.into_payload())
        .map_err(|e| RelayError::Validation(format!("Failed to encode payload: {}", e)))?;

    Ok(PreparedRequest {
        operation: O::NAME,
        path,
        payload,
        content_type: O::CONTENT_TYPE,
        policy: O::LINE_POLICY,
    })
}
