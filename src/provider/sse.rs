//! Incremental Server-Sent Events decoder.
//!
//! Network chunks may split lines (and UTF-8 sequences) at arbitrary
//! positions, so raw bytes are buffered until a full line is available.

use thiserror::Error;

#[derive(Error, Debug)]
#[error("Invalid UTF-8 in event stream: {0}")]
pub struct SseDecodeError(#[from] std::string::FromUtf8Error);

/// A decoded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Joined `data:` payload of one event.
    Data(String),
    /// The `[DONE]` sentinel.
    Done,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every event completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<SseEvent>, SseDecodeError> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8(line_bytes)?;
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Flush whatever is left once the byte stream has ended.
    pub fn finish(&mut self) -> Result<Option<SseEvent>, SseDecodeError> {
        if !self.buffer.is_empty() {
            let line = String::from_utf8(std::mem::take(&mut self.buffer))?;
            if let Some(event) = self.process_line(&line) {
                return Ok(Some(event));
            }
        }
        Ok(self.dispatch())
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        let line = line.trim_end_matches(['\n', '\r']);

        if line.is_empty() {
            return self.dispatch();
        }

        // Comment / keep-alive.
        if line.starts_with(':') {
            return None;
        }

        if let Some(rest) = line.strip_prefix("data:") {
            let data = rest.strip_prefix(' ').unwrap_or(rest);
            if data.trim() == "[DONE]" {
                self.data_lines.clear();
                return Some(SseEvent::Done);
            }
            self.data_lines.push(data.to_string());
        }

        // event:, id:, retry: carry nothing the relay needs.
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data_lines.is_empty() {
            return None;
        }
        let payload = self.data_lines.join("\n");
        self.data_lines.clear();
        if payload.trim().is_empty() {
            return None;
        }
        Some(SseEvent::Data(payload))
    }
}
