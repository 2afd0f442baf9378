//! HTTP generation backend.
//!
//! POSTs the payload to `{base_url}{path}?stream=true` and hands back the
//! response body as an unparsed byte stream.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::Value;

use super::traits::{ByteStream, GenerationBackend, UpstreamRequest};
use crate::error::RelayError;

/// Backend reached over HTTP.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a backend for `base_url`, which is injected once here and
    /// never looked up again per request.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn stream_url(&self, path: &str) -> String {
        format!("{}{}?stream=true", self.base_url, path)
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn open_stream(&self, request: UpstreamRequest) -> Result<ByteStream, RelayError> {
        let url = self.stream_url(request.path);
        tracing::debug!(%url, operation = request.operation, "Calling generation backend");

        let response = self
            .client
            .post(&url)
            .header("Accept", "text/event-stream")
            .header("X-Request-Id", &request.request_id)
            .json(&request.payload)
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                message: extract_error_message(status.as_u16(), &body),
            });
        }

        if response.content_length() == Some(0) {
            return Err(RelayError::MissingBody);
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| RelayError::Transport(e.to_string())))
            .boxed())
    }

    async fn health_check(&self) -> Result<(), RelayError> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RelayError::Upstream {
                status: response.status().as_u16(),
                message: "Health check failed".to_string(),
            });
        }

        Ok(())
    }
}

/// Pull a human-readable message out of an upstream error body.
///
/// Preference order: JSON `detail`, then JSON `error` (a string, or an object
/// carrying `message`), then the raw body text, then a generic fallback.
/// Non-string `detail` values (validation error lists) are passed on as JSON.
pub fn extract_error_message(status: u16, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["detail", "error"] {
            match map.get(key) {
                None | Some(Value::Null) => continue,
                Some(Value::String(s)) if s.trim().is_empty() => continue,
                Some(Value::String(s)) => return s.clone(),
                Some(Value::Object(inner)) => {
                    if let Some(msg) = inner.get("message").and_then(Value::as_str) {
                        return msg.to_string();
                    }
                    return Value::Object(inner.clone()).to_string();
                }
                Some(other) => return other.to_string(),
            }
        }
    }

    let text = body.trim();
    if !text.is_empty() {
        return text.to_string();
    }

    format!("Upstream request failed with status {}", status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_url() {
        let backend = HttpBackend::new(Client::new(), "http://backend:8000/");
        assert_eq!(
            backend.stream_url("/api/v1/exam/generate"),
            "http://backend:8000/api/v1/exam/generate?stream=true"
        );
    }

    #[test]
    fn test_extract_detail() {
        assert_eq!(
            extract_error_message(400, r#"{"detail":"Grade is required"}"#),
            "Grade is required"
        );
    }

    #[test]
    fn test_extract_error_field() {
        assert_eq!(extract_error_message(500, r#"{"error":"boom"}"#), "boom");
        assert_eq!(
            extract_error_message(500, r#"{"error":{"message":"nested boom","code":3}}"#),
            "nested boom"
        );
    }

    #[test]
    fn test_detail_preferred_over_error() {
        assert_eq!(
            extract_error_message(409, r#"{"error":"generic","detail":"specific"}"#),
            "specific"
        );
    }

    #[test]
    fn test_non_string_detail_serialized() {
        let msg = extract_error_message(422, r#"{"detail":[{"loc":["body","topic"]}]}"#);
        assert_eq!(msg, r#"[{"loc":["body","topic"]}]"#);
    }

    #[test]
    fn test_raw_text_fallback() {
        assert_eq!(extract_error_message(502, "  Bad gateway\n"), "Bad gateway");
        assert_eq!(
            extract_error_message(500, r#"{"message":"no known key"}"#),
            r#"{"message":"no known key"}"#
        );
    }

    #[test]
    fn test_generic_fallback() {
        assert_eq!(
            extract_error_message(503, ""),
            "Upstream request failed with status 503"
        );
    }
}
