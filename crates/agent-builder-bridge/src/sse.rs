use tracing::debug;

use crate::event::Event;

// Both prefixes carry their trailing space; `event:x` lines are ignored.
const TAG_PREFIX: &str = "event: ";
const PAYLOAD_PREFIX: &str = "data: ";

/// A finished `event:`/`data:` block from the response body.
#[derive(Debug, Clone, PartialEq)]
pub struct SseFrame {
    /// Value of the `event:` line.
    pub tag: String,
    /// JSON decoding of the `data:` line, or the raw text when it is not JSON.
    pub payload: serde_json::Value,
}

#[derive(Debug, Default)]
struct PartialFrame {
    tag: Option<String>,
    payload: Option<serde_json::Value>,
}

impl PartialFrame {
    fn feed(&mut self, line: &str) -> Option<SseFrame> {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            // An incomplete frame keeps accumulating across blank lines.
            if self.tag.is_some() && self.payload.is_some() {
                let tag = self.tag.take()?;
                let payload = self.payload.take()?;
                return Some(SseFrame { tag, payload });
            }
            return None;
        }
        if let Some(rest) = line.strip_prefix(TAG_PREFIX) {
            let tag = rest.trim();
            self.tag = (!tag.is_empty()).then(|| tag.to_string());
        } else if let Some(rest) = line.strip_prefix(PAYLOAD_PREFIX) {
            let payload = decode_payload(rest.trim());
            self.payload = is_present(&payload).then_some(payload);
        }
        None
    }

    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.payload.is_none()
    }
}

/// A payload of `null`, `false`, zero or an empty string does not complete a
/// frame.
fn is_present(payload: &serde_json::Value) -> bool {
    match payload {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

fn decode_payload(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

/// Incremental line-oriented SSE decoder.
///
/// Output does not depend on how the byte stream is sliced into chunks. Lines
/// are split on raw `\n` bytes before UTF-8 decoding, so a multi-byte
/// character split across two reads is decoded once both halves arrived.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    current: PartialFrame,
}

impl SseDecoder {
    /// Appends bytes and returns every frame completed by them.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buf[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.buf[start..end]);
            if let Some(frame) = self.current.feed(&line) {
                frames.push(frame);
            }
            start = end + 1;
        }
        self.buf.drain(..start);
        frames
    }

    /// Ends the stream, discarding the residual line and any unfinished frame.
    pub fn finish(&mut self) {
        if !self.buf.is_empty() || !self.current.is_empty() {
            debug!(
                residual_bytes = self.buf.len(),
                partial_tag = ?self.current.tag,
                "dropping unterminated SSE data at end of stream"
            );
        }
        self.buf.clear();
        self.current = PartialFrame::default();
    }
}

/// Parses a complete response body in one pass.
pub fn parse_events(text: &str) -> Vec<Event> {
    let mut decoder = SseDecoder::default();
    let events = decoder
        .push_chunk(text.as_bytes())
        .into_iter()
        .map(Event::from_frame)
        .collect();
    decoder.finish();
    events
}
