//! Stream processing utilities

/// Splits a chunked byte stream into complete lines
///
/// Bytes are accumulated until a `\n` arrives; everything before it is
/// returned as one line and the remainder stays buffered. Splitting happens
/// on raw bytes, so a multi-byte UTF-8 sequence cut across two chunks is
/// reassembled before it is decoded.
#[derive(Debug, Default)]
pub struct LineBuffer {
    /// Bytes received after the last newline
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Create an empty line buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, in order
    ///
    /// The returned lines do not include the trailing `\n`. A `\r` before
    /// the newline is kept; the frame parser tolerates it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            lines.push(String::from_utf8_lossy(&self.pending[start..end]).into_owned());
            start = end + 1;
        }

        if start > 0 {
            self.pending.drain(..start);
        }

        lines
    }

    /// Bytes held back waiting for a newline
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Whether an unterminated fragment is buffered
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// End of stream: drop the unterminated fragment without emitting it
    ///
    /// Returns the number of bytes discarded.
    pub fn finish(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_line_buffer_holds_partial_line() {
        let mut buffer = LineBuffer::new();

        assert!(buffer.feed(b"data: {\"type\":").is_empty());
        assert!(buffer.has_pending());

        let lines = buffer.feed(b"\"done\"}\nevent: ping\n");
        assert_eq!(lines, vec!["data: {\"type\":\"done\"}", "event: ping"]);
        assert!(!buffer.has_pending());
    }

    #[test]
    fn test_line_buffer_keeps_empty_lines() {
        let mut buffer = LineBuffer::new();

        let lines = buffer.feed(b"a\n\nb\n");
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[test]
    fn test_line_buffer_reassembles_split_utf8() {
        let mut buffer = LineBuffer::new();
        let text = "data: 你好\n".as_bytes();

        // Cut inside the three-byte encoding of the first character
        assert!(buffer.feed(&text[..7]).is_empty());
        let lines = buffer.feed(&text[7..]);
        assert_eq!(lines, vec!["data: 你好"]);
    }

    #[test]
    fn test_line_buffer_discards_trailing_fragment() {
        // An unterminated last line is never emitted, even at end of stream.
        // This matches the browser client; a flushing decoder would return it.
        let mut buffer = LineBuffer::new();

        let lines = buffer.feed(b"data: one\ndata: two");
        assert_eq!(lines, vec!["data: one"]);
        assert_eq!(buffer.pending(), b"data: two");

        assert_eq!(buffer.finish(), 9);
        assert!(!buffer.has_pending());
    }

    fn split_at_points(bytes: &[u8], mut points: Vec<usize>) -> Vec<&[u8]> {
        points.retain(|p| *p <= bytes.len());
        points.sort_unstable();
        points.dedup();

        let mut chunks = Vec::new();
        let mut start = 0;
        for point in points {
            chunks.push(&bytes[start..point]);
            start = point;
        }
        chunks.push(&bytes[start..]);
        chunks
    }

    proptest! {
        #[test]
        fn prop_chunking_invariance(
            lines in prop::collection::vec("[a-z:{}\" é你]{0,12}", 0..8),
            cuts in prop::collection::vec(0usize..120, 0..10),
        ) {
            let mut wire = String::new();
            for line in &lines {
                wire.push_str(line);
                wire.push('\n');
            }
            let bytes = wire.as_bytes();

            let mut whole = LineBuffer::new();
            let expected = whole.feed(bytes);

            let mut chunked = LineBuffer::new();
            let mut actual = Vec::new();
            for chunk in split_at_points(bytes, cuts) {
                actual.extend(chunked.feed(chunk));
            }

            prop_assert_eq!(&actual, &expected);
            prop_assert_eq!(actual, lines);
        }
    }
}
