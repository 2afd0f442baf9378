//! SSE (Server-Sent Events) line classification and formatting.

use bytes::Bytes;
use serde_json::{json, Value};

/// Literal prefix of a data line. A bare `data:` without the space is not
/// treated as a data line.
pub const DATA_PREFIX: &str = "data: ";

/// Event type whose `data.chunk` is forwarded to the caller.
pub const CONTENT_EVENT: &str = "content";

/// End-of-stream sentinel some backends send after the last event.
const DONE_SENTINEL: &str = "[DONE]";

/// How an endpoint treats upstream lines that are not `data: ` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinePolicy {
    /// Only content-event chunks reach the caller.
    #[default]
    ContentOnly,
    /// Content-event chunks, plus any non-blank line that is neither a data
    /// line nor an SSE comment, forwarded verbatim with its newline.
    ForwardPlainLines,
}

/// A decoded `data: ` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedEvent {
    Content { chunk: String },
    Other { kind: String },
}

impl ParsedEvent {
    /// Decode a JSON payload into a tagged event.
    ///
    /// A `content` event with a missing, empty or non-string `data.chunk`
    /// decodes as `Other`.
    pub fn decode(payload: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(payload)?;
        let kind = value.get("type").and_then(Value::as_str).unwrap_or_default();

        if kind == CONTENT_EVENT {
            if let Some(chunk) = value.pointer("/data/chunk").and_then(Value::as_str) {
                if !chunk.is_empty() {
                    return Ok(ParsedEvent::Content {
                        chunk: chunk.to_string(),
                    });
                }
            }
        }

        Ok(ParsedEvent::Other {
            kind: kind.to_string(),
        })
    }
}

/// Classification of one complete upstream line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Text extracted from a content event.
    Content(String),
    /// A plain line forwarded under [`LinePolicy::ForwardPlainLines`].
    Forward(String),
    /// Blank lines, comments, non-content events.
    Ignored,
    /// A data line whose payload is not valid JSON.
    Malformed(String),
}

impl LineOutcome {
    /// Bytes to write to the caller, if any.
    pub fn into_output(self) -> Option<Bytes> {
        match self {
            LineOutcome::Content(text) | LineOutcome::Forward(text) => Some(Bytes::from(text)),
            LineOutcome::Ignored | LineOutcome::Malformed(_) => None,
        }
    }
}

/// Classify a single complete line (terminator already removed).
pub fn classify_line(line: &str, policy: LinePolicy) -> LineOutcome {
    if let Some(rest) = line.strip_prefix(DATA_PREFIX) {
        let payload = rest.trim();
        if payload.is_empty() || payload == DONE_SENTINEL {
            return LineOutcome::Ignored;
        }
        return match ParsedEvent::decode(payload) {
            Ok(ParsedEvent::Content { chunk }) => LineOutcome::Content(chunk),
            Ok(ParsedEvent::Other { .. }) => LineOutcome::Ignored,
            Err(e) => LineOutcome::Malformed(e.to_string()),
        };
    }

    match policy {
        LinePolicy::ContentOnly => LineOutcome::Ignored,
        LinePolicy::ForwardPlainLines => {
            if line.trim().is_empty() || line.starts_with(':') {
                LineOutcome::Ignored
            } else {
                LineOutcome::Forward(format!("{}\n", line))
            }
        }
    }
}

/// Format a content event the way the generation backend emits it.
pub fn format_content_event(chunk: &str) -> Bytes {
    format_event(CONTENT_EVENT, json!({ "chunk": chunk }))
}

/// Format an arbitrary typed event as an SSE data line plus separator.
pub fn format_event(kind: &str, data: Value) -> Bytes {
    let event = json!({ "type": kind, "data": data });
    format!("{}{}\n\n", DATA_PREFIX, event).into()
}
