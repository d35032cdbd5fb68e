//! Incremental `text/event-stream` decoder.
//!
//! Bytes may be split anywhere, including inside a CRLF pair. Lines end in
//! LF, CRLF or a lone CR; a blank line dispatches the buffered event.
//! Only the `data` and `event` fields are kept.

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Event name; `None` for unnamed events
    pub event: Option<String>,
    /// Data lines joined with `\n`
    pub data: String,
}

impl SseFrame {
    /// Whether an `EventSource.onmessage` listener would see this frame.
    pub fn is_message(&self) -> bool {
        matches!(self.event.as_deref(), None | Some("message"))
    }
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: String,
    /// Previous chunk ended in CR; a leading LF belongs to it
    after_cr: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        if chunk.is_empty() {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut start = 0;
        if self.after_cr {
            self.after_cr = false;
            if self.buffer.first() == Some(&b'\n') {
                start = 1;
            }
        }

        let mut frames = Vec::new();
        while let Some(offset) = self.buffer[start..]
            .iter()
            .position(|b| *b == b'\n' || *b == b'\r')
        {
            let end = start + offset;
            let terminator = if self.buffer[end] == b'\r' {
                match self.buffer.get(end + 1) {
                    Some(b'\n') => 2,
                    Some(_) => 1,
                    None => {
                        self.after_cr = true;
                        1
                    }
                }
            } else {
                1
            };

            let line = String::from_utf8_lossy(&self.buffer[start..end]).into_owned();
            start = end + terminator;
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }

        self.buffer.drain(..start);
        frames
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "event" => self.event = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take().filter(|name| !name.is_empty());
        if self.data.is_empty() {
            return None;
        }
        let mut data = std::mem::take(&mut self.data);
        data.pop();
        Some(SseFrame { event, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(data: &str) -> SseFrame {
        SseFrame {
            event: None,
            data: data.to_string(),
        }
    }

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: {\"a\":1}\n\n");
        assert_eq!(frames, vec![message("{\"a\":1}")]);
    }

    #[test]
    fn test_multiline_data_and_comments() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b": keepalive\ndata: first\ndata:second\nid: 7\nretry: 100\n\n");
        assert_eq!(frames, vec![message("first\nsecond")]);
    }

    #[test]
    fn test_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"da").is_empty());
        assert!(decoder.feed(b"ta: hel").is_empty());
        assert!(decoder.feed(b"lo\r").is_empty());
        assert!(decoder.feed(b"\n").is_empty());
        assert_eq!(decoder.feed(b"\r\n"), vec![message("hello")]);
    }

    #[test]
    fn test_lone_cr_line_endings() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: a\r\rdata: b\r\r");
        assert_eq!(frames, vec![message("a"), message("b")]);
    }

    #[test]
    fn test_named_events() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"event: ping\ndata: x\n\nevent: message\ndata: y\n\n");
        assert_eq!(frames.len(), 2);
        assert!(!frames[0].is_message());
        assert_eq!(frames[0].event.as_deref(), Some("ping"));
        assert!(frames[1].is_message());
    }

    #[test]
    fn test_blank_lines_without_data_dispatch_nothing() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"\n\nevent: ping\n\n").is_empty());
        // The event name does not leak into the next frame.
        assert_eq!(decoder.feed(b"data: z\n\n"), vec![message("z")]);
    }

    #[test]
    fn test_unfinished_event_is_held() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: partial\n").is_empty());
    }
}
