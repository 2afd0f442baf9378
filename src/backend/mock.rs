//! Mock backend for local runs and demos.
//!
//! Emits the same SSE event wire format as the real generation service, so
//! the full parse path is exercised without a network hop.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use std::time::Duration;

use super::traits::{scripted_stream, ByteStream, GenerationBackend, UpstreamRequest};
use crate::error::RelayError;
use crate::streaming::{format_content_event, format_event};

/// Mock backend that streams a canned response word-by-word.
pub struct MockBackend {
    /// Delay between chunks.
    chunk_delay: Duration,
}

impl MockBackend {
    /// Create a new mock backend.
    pub fn new() -> Self {
        Self {
            chunk_delay: Duration::from_millis(50),
        }
    }

    /// Create with custom chunk delay.
    pub fn with_delay(chunk_delay: Duration) -> Self {
        Self { chunk_delay }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn open_stream(&self, request: UpstreamRequest) -> Result<ByteStream, RelayError> {
        let subject = ["topic", "exam_name", "instructions"]
            .iter()
            .find_map(|key| request.payload.get(*key).and_then(Value::as_str))
            .unwrap_or("your request");

        let response = format!(
            "This is a mock {} response about {}. Point the relay at a real \
             generation backend to get actual content.",
            request.operation, subject
        );

        let mut chunks: Vec<Result<Bytes, RelayError>> = vec![Ok(format_event(
            "status",
            json!({ "message": "generation started" }),
        ))];

        for (i, word) in response.split_whitespace().enumerate() {
            let chunk = if i == 0 {
                word.to_string()
            } else {
                format!(" {}", word)
            };
            chunks.push(Ok(format_content_event(&chunk)));
        }

        chunks.push(Ok(format_event("complete", json!({}))));

        Ok(scripted_stream(chunks, Some(self.chunk_delay)))
    }

    async fn health_check(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::{LinePolicy, SseTranscoder};
    use futures::StreamExt;

    #[tokio::test]
    async fn test_mock_stream() {
        let backend = MockBackend::with_delay(Duration::from_millis(1));

        let request = UpstreamRequest {
            operation: "exam-generation",
            path: "/api/v1/exam/generate",
            payload: json!({ "exam_name": "Midterm" }),
            request_id: "test-1".to_string(),
        };

        let mut stream = backend.open_stream(request).await.unwrap();
        let mut transcoder = SseTranscoder::new(LinePolicy::ContentOnly);
        let mut text = String::new();

        while let Some(chunk) = stream.next().await {
            for out in transcoder.feed(&chunk.unwrap()) {
                text.push_str(std::str::from_utf8(&out).unwrap());
            }
        }

        assert!(text.starts_with("This is a mock exam-generation response about Midterm."));
        assert_eq!(transcoder.stats().malformed, 0);
    }
}
