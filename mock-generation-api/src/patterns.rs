//! Test pattern handling for relay validation.
//!
//! The X-Test-Pattern header selects a scripted response instead of the
//! default lesson stream:
//! - `unicode` - Emoji, CJK, 4-byte UTF-8 chunks
//! - `short` - one character per event
//! - `long` - 4KB chunks
//! - `abort:N` - reset the connection after N events
//! - `malformed` - valid events mixed with broken JSON, comments and [DONE]
//! - `plain` - comic-style plain text lines between events
//! - `error:STATUS` - fail with STATUS and a JSON `detail`
//! - `empty` - 200 with an empty body

use bytes::Bytes;

use crate::responses::{complete_event, content_event, event, status_event};

/// Parsed test pattern from X-Test-Pattern header.
#[derive(Debug, Clone, PartialEq)]
pub enum TestPattern {
    Default,
    Unicode,
    Short,
    Long,
    Abort(usize),
    Malformed,
    PlainLines,
    Error(u16),
    Empty,
}

impl TestPattern {
    /// Parse X-Test-Pattern header value into a TestPattern.
    pub fn parse(header: Option<&str>) -> Self {
        let header = match header.map(str::trim) {
            Some(h) if !h.is_empty() => h,
            _ => return TestPattern::Default,
        };

        match header {
            "unicode" => TestPattern::Unicode,
            "short" => TestPattern::Short,
            "long" => TestPattern::Long,
            "malformed" => TestPattern::Malformed,
            "plain" => TestPattern::PlainLines,
            "empty" => TestPattern::Empty,
            s if s.starts_with("abort:") => TestPattern::Abort(s[6..].parse().unwrap_or(5)),
            s if s.starts_with("error:") => {
                let status = s[6..]
                    .parse()
                    .ok()
                    .filter(|code| (400..600).contains(code))
                    .unwrap_or(500);
                TestPattern::Error(status)
            }
            _ => TestPattern::Default,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TestPattern::Default => "default",
            TestPattern::Unicode => "unicode",
            TestPattern::Short => "short",
            TestPattern::Long => "long",
            TestPattern::Abort(_) => "abort",
            TestPattern::Malformed => "malformed",
            TestPattern::PlainLines => "plain",
            TestPattern::Error(_) => "error",
            TestPattern::Empty => "empty",
        }
    }

    /// Scripted body for streaming patterns. `None` for patterns that do not
    /// stream (`Default`, `Error`, `Empty`).
    pub fn script(&self) -> Option<Script> {
        let mut events: Vec<Bytes> = match self {
            TestPattern::Unicode => UNICODE_CHUNKS.iter().map(|c| content_event(c)).collect(),
            TestPattern::Short => "Short chunks, one character each."
                .chars()
                .map(|c| content_event(c.encode_utf8(&mut [0u8; 4])))
                .collect(),
            TestPattern::Long => {
                let chunk = long_chunk_content();
                (0..3).map(|_| content_event(&chunk)).collect()
            }
            TestPattern::Abort(n) => {
                let events = (0..*n)
                    .map(|i| content_event(&format!("part {} ", i + 1)))
                    .collect();
                return Some(Script {
                    events,
                    abort: true,
                });
            }
            TestPattern::Malformed => vec![
                Bytes::from_static(b": keep-alive\n\n"),
                status_event("generating"),
                Bytes::from_static(b"data: {\"type\":\"content\",\"data\":{\"chunk\":\"Hel"),
                Bytes::from_static(b"lo\"}}\r\n\r\n"),
                Bytes::from_static(b"data: {\"type\":\"content\",\"data\":\n\n"),
                Bytes::from_static(b"data: not json at all\n\n"),
                event("content", serde_json::json!({ "chunk": "" })),
                content_event(" world"),
                Bytes::from_static(b"data: [DONE]\n\n"),
            ],
            TestPattern::PlainLines => vec![
                status_event("drawing"),
                Bytes::from_static(b"Panel 1: A seed falls into the soil.\n"),
                Bytes::from_static(b": comment lines are never forwarded\n\n"),
                Bytes::from_static(b"Panel 2: Roots reach down"),
                Bytes::from_static(b" for water.\n"),
                content_event("Caption: Growing up!"),
                Bytes::from_static(b"\nPanel 3: A sprout sees the sun.\n"),
            ],
            TestPattern::Default | TestPattern::Error(_) | TestPattern::Empty => return None,
        };

        events.push(complete_event());
        Some(Script {
            events,
            abort: false,
        })
    }
}

/// A scripted streaming response.
pub struct Script {
    pub events: Vec<Bytes>,
    /// Reset the connection after the last event instead of ending cleanly.
    pub abort: bool,
}

const UNICODE_CHUNKS: &[&str] = &[
    "\u{1F600}",
    "\u{1F4A1}",
    "\u{2728}",
    " \u{4E2D}\u{6587}",
    " \u{65E5}\u{672C}\u{8A9E}",
    " \u{1D400}\u{1D401}\u{1D402}",
    " \u{10348}",
    " Hello \u{4E16}\u{754C}! \u{1F30D}",
    " \u{D55C}\u{AD6D}\u{C5B4} \u{1F1F0}\u{1F1F7}",
];

/// About 4KB of lesson text.
fn long_chunk_content() -> String {
    const CHUNK_SIZE: usize = 4096;
    let base = "Photosynthesis turns light energy into chemical energy stored in glucose. \
                Chlorophyll in the leaves absorbs mostly red and blue light. ";
    base.repeat(CHUNK_SIZE / base.len() + 1)[..CHUNK_SIZE].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default() {
        assert_eq!(TestPattern::parse(None), TestPattern::Default);
        assert_eq!(TestPattern::parse(Some(" ")), TestPattern::Default);
        assert_eq!(TestPattern::parse(Some("unknown")), TestPattern::Default);
    }

    #[test]
    fn test_parse_abort() {
        assert_eq!(TestPattern::parse(Some("abort:3")), TestPattern::Abort(3));
        assert_eq!(TestPattern::parse(Some("abort:xyz")), TestPattern::Abort(5));
    }

    #[test]
    fn test_parse_error() {
        assert_eq!(TestPattern::parse(Some("error:422")), TestPattern::Error(422));
        assert_eq!(TestPattern::parse(Some("error:200")), TestPattern::Error(500));
        assert_eq!(TestPattern::parse(Some("error:")), TestPattern::Error(500));
    }

    #[test]
    fn test_abort_has_no_complete_event() {
        let script = TestPattern::Abort(3).script().unwrap();
        assert!(script.abort);
        assert_eq!(script.events.len(), 3);
    }

    #[test]
    fn test_streaming_patterns_end_with_complete() {
        for pattern in [
            TestPattern::Unicode,
            TestPattern::Short,
            TestPattern::Long,
            TestPattern::Malformed,
            TestPattern::PlainLines,
        ] {
            let script = pattern.script().unwrap();
            assert!(!script.abort);
            let last = script.events.last().unwrap();
            assert!(std::str::from_utf8(last).unwrap().contains("\"complete\""));
        }
    }

    #[test]
    fn test_non_streaming_patterns() {
        assert!(TestPattern::Default.script().is_none());
        assert!(TestPattern::Error(503).script().is_none());
        assert!(TestPattern::Empty.script().is_none());
    }

    #[test]
    fn test_long_chunk_size() {
        assert_eq!(long_chunk_content().len(), 4096);
    }
}
