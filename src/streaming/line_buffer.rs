//! Reassembly of newline-terminated lines from arbitrarily split network reads.

/// Holds the unterminated tail of the most recent read.
///
/// Bytes are buffered undecoded, so a multi-byte UTF-8 sequence split across
/// two reads is only decoded once the line carrying it is complete. After
/// every [`push`](LineBuffer::push) the buffer contains no `\n`, i.e. at most
/// one incomplete line.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a network chunk and return every line it completes, in order.
    ///
    /// Returned lines have the `\n` terminator (and a preceding `\r`, if any)
    /// removed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        // Everything already pending is newline-free, so only the new bytes
        // need scanning.
        let scanned = self.pending.len();
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending[scanned..]
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|i| scanned + i)
        else {
            return Vec::new();
        };

        let tail = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, tail);

        complete[..last_newline]
            .split(|&b| b == b'\n')
            .map(decode_line)
            .collect()
    }

    /// Drain whatever is left once the upstream has ended.
    ///
    /// Returns `None` when the final line was properly terminated.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(decode_line(&rest))
    }

    /// Number of buffered bytes not yet terminated by a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_chunk_multiple_lines() {
        let mut buf = LineBuffer::new();
        let lines = buf.push(b"data: a\n\ndata: b\n");
        assert_eq!(lines, vec!["data: a", "", "data: b"]);
        assert_eq!(buf.pending_len(), 0);
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn test_line_split_across_reads() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"da").is_empty());
        assert!(buf.push(b"ta: hel").is_empty());
        assert_eq!(buf.push(b"lo\nda"), vec!["data: hello"]);
        assert_eq!(buf.pending_len(), 2);
        assert_eq!(buf.finish().as_deref(), Some("da"));
    }

    #[test]
    fn test_split_utf8_sequence() {
        // "é" is 0xC3 0xA9
        let mut buf = LineBuffer::new();
        assert!(buf.push(&[b'x', 0xC3]).is_empty());
        assert_eq!(buf.push(&[0xA9, b'\n']), vec!["xé"]);
    }

    #[test]
    fn test_crlf_terminators() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"data: x\r\n\r\n"), vec!["data: x", ""]);
    }

    #[test]
    fn test_carriage_return_split_from_newline() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"data: x\r").is_empty());
        assert_eq!(buf.push(b"\n"), vec!["data: x"]);
    }

    #[test]
    fn test_long_line_in_small_reads() {
        let mut buf = LineBuffer::new();
        let line = "data: ".to_string() + &"ab".repeat(50_000);
        for piece in line.as_bytes().chunks(7) {
            assert!(buf.push(piece).is_empty());
        }
        assert_eq!(buf.pending_len(), line.len());
        assert_eq!(buf.push(b"\nnext"), vec![line]);
        assert_eq!(buf.finish().as_deref(), Some("next"));
    }

    #[test]
    fn test_never_retains_a_newline() {
        let mut buf = LineBuffer::new();
        for chunk in [&b"a\nb"[..], b"\n\nc", b"d\n", b"e"] {
            buf.push(chunk);
            assert!(buf.pending_len() <= 2);
        }
        assert_eq!(buf.finish().as_deref(), Some("e"));
    }
}
