//! Server-sent events framing
//!
//! Bytes arrive in arbitrary chunks. Lines are only decoded once complete so a
//! multi-byte character split across chunks is never mangled.

/// One dispatched event. Only the fields Gemini sends are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every event completed by it
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush whatever is left once the body ends
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.buf.is_empty() {
            let raw = std::mem::take(&mut self.buf);
            let line = String::from_utf8_lossy(&raw).into_owned();
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(event) = self.process_line(line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            // id / retry are irrelevant without reconnects
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent { event, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(events: &[SseEvent]) -> Vec<&str> {
        events.iter().map(|e| e.data.as_str()).collect()
    }

    #[test]
    fn test_events_split_across_chunks() {
        let mut dec = SseDecoder::new();
        assert!(dec.feed(b"data: {\"a\"").is_empty());
        assert!(dec.feed(b":1}\n").is_empty());
        let events = dec.feed(b"\ndata: {\"b\":2}\n\n");
        assert_eq!(data(&events), vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn test_crlf_and_comments() {
        let mut dec = SseDecoder::new();
        let events = dec.feed(b": keep-alive\r\n\r\nevent: message\r\ndata: x\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("message"));
        assert_eq!(events[0].data, "x");
    }

    #[test]
    fn test_multiline_data_joined() {
        let mut dec = SseDecoder::new();
        let events = dec.feed(b"data: one\ndata:two\n\n");
        assert_eq!(data(&events), vec!["one\ntwo"]);
    }

    #[test]
    fn test_utf8_split_inside_character() {
        let text = "data: caf\u{e9} \u{2705}\n\n".as_bytes();
        let mut dec = SseDecoder::new();
        let mut events = Vec::new();
        for b in text {
            events.extend(dec.feed(std::slice::from_ref(b)));
        }
        assert_eq!(data(&events), vec!["caf\u{e9} \u{2705}"]);
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut dec = SseDecoder::new();
        assert!(dec.feed(b"data: tail").is_empty());
        let last = dec.finish().unwrap();
        assert_eq!(last.data, "tail");
        assert!(dec.finish().is_none());
    }
}
