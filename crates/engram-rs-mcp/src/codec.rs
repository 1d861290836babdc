//! Frame decoding for the MCP stdio stream.
//!
//! Servers either emit newline-delimited JSON or LSP-style
//! `Content-Length` framed messages; both forms are accepted.

const MAX_FRAME_SIZE: usize = 8 * 1024 * 1024;

/// Incremental decoder over the raw stdout byte stream.
#[derive(Debug, Default)]
pub(crate) struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append freshly read bytes.
    pub(crate) fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Pop the next complete message body, if one is buffered.
    pub(crate) fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            while matches!(self.buffer.first(), Some(b'\n' | b'\r')) {
                self.buffer.remove(0);
            }
            if self.buffer.is_empty() {
                return None;
            }

            if starts_with_content_length(&self.buffer) {
                return self.next_length_framed();
            }

            let newline = self.buffer.iter().position(|b| *b == b'\n')?;
            let mut line = self.buffer[..newline].to_vec();
            self.buffer.drain(..=newline);
            while matches!(line.last(), Some(b'\r')) {
                line.pop();
            }
            if line.is_empty() {
                continue;
            }
            return Some(line);
        }
    }

    fn next_length_framed(&mut self) -> Option<Vec<u8>> {
        let (header_end, delimiter_len) = find_header_end(&self.buffer)?;
        let headers = String::from_utf8_lossy(&self.buffer[..header_end]);
        let content_length = headers.lines().find_map(|line| {
            line.to_ascii_lowercase()
                .strip_prefix("content-length:")
                .and_then(|rest| rest.trim().parse::<usize>().ok())
        })?;

        if content_length > MAX_FRAME_SIZE {
            self.buffer.clear();
            return None;
        }

        let body_start = header_end + delimiter_len;
        if self.buffer.len() < body_start + content_length {
            return None;
        }

        let body = self.buffer[body_start..body_start + content_length].to_vec();
        self.buffer.drain(..body_start + content_length);
        Some(body)
    }
}

fn starts_with_content_length(buffer: &[u8]) -> bool {
    let prefix = b"content-length:";
    buffer.len() >= prefix.len()
        && buffer[..prefix.len()]
            .iter()
            .zip(prefix.iter())
            .all(|(a, b)| a.to_ascii_lowercase() == *b)
}

fn find_header_end(buffer: &[u8]) -> Option<(usize, usize)> {
    if let Some(pos) = find_subsequence(buffer, b"\r\n\r\n") {
        return Some((pos, 4));
    }
    if let Some(pos) = find_subsequence(buffer, b"\n\n") {
        return Some((pos, 2));
    }
    None
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::FrameDecoder;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_newline_delimited_frame() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"{\"jsonrpc\":\"2.0\",\"id\":1}\n");
        let frame = decoder.next_frame().unwrap();
        assert_eq!(frame, b"{\"jsonrpc\":\"2.0\",\"id\":1}".to_vec());
        assert!(decoder.next_frame().is_none());
    }

    #[test]
    fn decodes_content_length_frame() {
        let body = b"{\"jsonrpc\":\"2.0\",\"id\":1}";
        let mut decoder = FrameDecoder::new();
        decoder.push(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes());
        decoder.push(body);
        assert_eq!(decoder.next_frame().unwrap(), body.to_vec());
    }

    #[test]
    fn waits_for_complete_length_framed_body() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"Content-Length: 10\r\n\r\n{\"id\"");
        assert!(decoder.next_frame().is_none());
        decoder.push(b":123}");
        assert_eq!(decoder.next_frame().unwrap(), b"{\"id\":123}".to_vec());
    }

    #[test]
    fn skips_blank_lines_between_frames() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"\r\n\n{\"id\":1}\n\n{\"id\":2}\n");
        assert_eq!(decoder.next_frame().unwrap(), b"{\"id\":1}".to_vec());
        assert_eq!(decoder.next_frame().unwrap(), b"{\"id\":2}".to_vec());
        assert!(decoder.next_frame().is_none());
    }

    #[test]
    fn partial_line_yields_nothing_until_newline() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"{\"id\":1");
        assert!(decoder.next_frame().is_none());
        decoder.push(b"}\n");
        assert_eq!(decoder.next_frame().unwrap(), b"{\"id\":1}".to_vec());
    }
}
