use bytes::Bytes;
use serde_json::{json, Value};

/// Encode one typed event the way the generation service does:
/// `data: {"type": kind, "data": data}` followed by a blank line.
pub fn event(kind: &str, data: Value) -> Bytes {
    let payload = json!({ "type": kind, "data": data });
    Bytes::from(format!("data: {}\n\n", payload))
}

/// A `content` event carrying one text chunk.
pub fn content_event(chunk: &str) -> Bytes {
    event("content", json!({ "chunk": chunk }))
}

pub fn status_event(message: &str) -> Bytes {
    event("status", json!({ "message": message }))
}

pub fn complete_event() -> Bytes {
    event("complete", json!({ "finished": true }))
}

/// Pre-computed content events for the default response.
/// Words are cycled if chunk_count exceeds the word list length.
pub struct ResponseChunks {
    chunks: Vec<Bytes>,
}

impl ResponseChunks {
    pub fn new(chunk_count: usize) -> Self {
        const WORDS: &[&str] = &[
            " Begin",
            " with",
            " a",
            " short",
            " warm-up",
            " question",
            ".",
            " Introduce",
            " the",
            " key",
            " vocabulary",
            ",",
            " then",
            " work",
            " through",
            " two",
            " guided",
            " examples",
            ".",
            " Close",
            " with",
            " an",
            " exit",
            " ticket",
            ".",
        ];

        let chunks = (0..chunk_count.max(1))
            .map(|i| content_event(WORDS[i % WORDS.len()]))
            .collect();

        Self { chunks }
    }

    /// Iterator over content events.
    pub fn content_chunks(&self) -> impl Iterator<Item = Bytes> + '_ {
        self.chunks.iter().cloned()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }
}

/// Response for /health
pub fn health_response() -> Value {
    json!({ "status": "ok" })
}
