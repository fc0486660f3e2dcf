//! Incremental `text/event-stream` decoder
//!
//! Bytes arrive in arbitrary chunks; complete lines are consumed as they
//! appear and the partial tail is kept until the next chunk.

use crate::transport::ChannelEvent;
use pulse_shared::{PulseError, PulseResult};

/// Longest partial line kept between chunks
pub const MAX_LINE_BYTES: usize = 1 << 20;

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    // bytes of `buffer` already known to hold no line break
    scanned: usize,
    event: Option<String>,
    data: Vec<String>,
    last_id: Option<String>,
    started: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event it completed, in order.
    ///
    /// Fails once the unterminated tail grows past [`MAX_LINE_BYTES`].
    pub fn feed(&mut self, chunk: &[u8]) -> PulseResult<Vec<ChannelEvent>> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
            let pos = self.scanned + offset;
            self.scanned = 0;
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if !self.started {
                self.started = true;
                if line.starts_with("\u{feff}".as_bytes()) {
                    line.drain(..3);
                }
            }
            if let Some(event) = self.process_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }

        self.scanned = self.buffer.len();
        if self.buffer.len() > MAX_LINE_BYTES {
            return Err(PulseError::DataParse {
                message: format!("event-stream line longer than {} bytes", MAX_LINE_BYTES),
                line: None,
            });
        }
        Ok(events)
    }

    fn process_line(&mut self, line: &str) -> Option<ChannelEvent> {
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
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            // retry hints are meaningless without automatic reconnection
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<ChannelEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(ChannelEvent {
            event: event
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| ChannelEvent::MESSAGE.to_string()),
            data,
            id: self.last_id.clone(),
        })
    }
}
