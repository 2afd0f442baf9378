//! SSE parsing and re-streaming.

mod line_buffer;
mod relay;
mod sse;
mod transcoder;

pub use line_buffer::LineBuffer;
pub use relay::{spawn_relay, RelayBody, RelayContext};
pub use sse::{
    classify_line, format_content_event, format_event, LineOutcome, LinePolicy, ParsedEvent,
    CONTENT_EVENT, DATA_PREFIX,
};
pub use transcoder::{SseTranscoder, TranscodeStats};
