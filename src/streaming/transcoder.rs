//! Incremental transcoding of an upstream SSE byte stream into caller output.

use bytes::Bytes;

use super::line_buffer::LineBuffer;
use super::sse::{classify_line, LineOutcome, LinePolicy};

/// Per-invocation counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeStats {
    pub lines: u64,
    pub chunks_out: u64,
    pub bytes_out: u64,
    pub malformed: u64,
}

/// Turns network chunks into output chunks, preserving arrival order.
///
/// Output only ever depends on the concatenation of the fed bytes, never on
/// where the chunk boundaries fell.
#[derive(Debug)]
pub struct SseTranscoder {
    buffer: LineBuffer,
    policy: LinePolicy,
    stats: TranscodeStats,
}

impl SseTranscoder {
    pub fn new(policy: LinePolicy) -> Self {
        Self {
            buffer: LineBuffer::new(),
            policy,
            stats: TranscodeStats::default(),
        }
    }

    /// Feed one network chunk; returns the output chunks it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        let lines = self.buffer.push(chunk);
        let mut out = Vec::new();
        for line in &lines {
            self.handle_line(line, true, &mut out);
        }
        out
    }

    /// Flush a final line that arrived without a trailing newline.
    ///
    /// A forwarded plain line is written without the newline it never had.
    pub fn finish(&mut self) -> Vec<Bytes> {
        let mut out = Vec::new();
        if let Some(line) = self.buffer.finish() {
            self.handle_line(&line, false, &mut out);
        }
        out
    }

    pub fn stats(&self) -> TranscodeStats {
        self.stats
    }

    fn handle_line(&mut self, line: &str, terminated: bool, out: &mut Vec<Bytes>) {
        self.stats.lines += 1;
        let mut outcome = classify_line(line, self.policy);

        if let LineOutcome::Forward(text) = &mut outcome {
            if !terminated && text.ends_with('\n') {
                text.pop();
            }
        }

        if let LineOutcome::Malformed(reason) = &outcome {
            self.stats.malformed += 1;
            tracing::debug!(error = %reason, line_len = line.len(), "Dropping malformed event");
            return;
        }

        if let Some(bytes) = outcome.into_output() {
            self.stats.chunks_out += 1;
            self.stats.bytes_out += bytes.len() as u64;
            out.push(bytes);
        }
    }
}
