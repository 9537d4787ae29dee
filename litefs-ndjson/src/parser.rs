//! Newline-delimited stream framer
//!
//! Splits a streamed body into lines:
//! - `\n` terminates a line, a trailing `\r` is dropped (CRLF producers)
//! - bytes after the last `\n` are held until more data arrives
//! - the held bytes can be inspected at end of stream to tell a clean
//!   close from one that cut an object in half

/// Streaming line parser that accumulates bytes and yields complete lines
#[derive(Debug, Default)]
pub struct LineParser {
    /// Bytes of the current, unterminated line
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no newline
    scanned: usize,
}

impl LineParser {
    /// Create a new parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes into the parser and return any complete lines
    ///
    /// Raw bytes are buffered until a newline is seen, so a multi-byte
    /// character split across two chunks is reassembled intact.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;

        while let Some(offset) = self.buffer[from..].iter().position(|&b| b == b'\n') {
            let end = from + offset;
            let mut line = &self.buffer[start..end];
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }
            lines.push(decode_line(line));
            start = end + 1;
            from = start;
        }

        self.buffer.drain(..start);
        self.scanned = self.buffer.len();
        lines
    }

    /// Whether a partial line with non-whitespace content is buffered
    pub fn has_partial(&self) -> bool {
        self.buffer.iter().any(|b| !b.is_ascii_whitespace())
    }

    /// Remove and return the buffered partial line, if it has any content
    pub fn take_partial(&mut self) -> Option<String> {
        let line = self.has_partial().then(|| decode_line(&self.buffer));
        self.buffer.clear();
        self.scanned = 0;
        line
    }
}

fn decode_line(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            tracing::warn!(len = bytes.len(), "Received invalid UTF-8 in event stream");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}
