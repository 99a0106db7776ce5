//! Incremental decoder for the chat stream protocol.
//!
//! The transport delivers arbitrary byte slices; frames are newline-delimited
//! `data: {json}` lines. Partial lines (including partial UTF-8 sequences)
//! are carried over to the next read.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;

use chat_types::{event::StreamEvent, ChatError, Result};

use crate::ports::ByteStream;

const DATA_PREFIX: &str = "data:";
const PREVIEW_CHARS: usize = 80;

/// Decoded events; ends after `done`, after the first error, or at end of input.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>>>>;

/// Every field optional so unknown frame shapes decode and get ignored
#[derive(Deserialize)]
struct WireFrame {
    chunk: Option<String>,
    done: Option<bool>,
    error: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Default)]
pub struct StreamParser {
    buffer: Vec<u8>,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read's worth of bytes.
    ///
    /// Returns the outcome of every complete line, in order. A backend `error`
    /// frame or a markup payload comes back as `Err`.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<StreamEvent>> {
        self.buffer.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            parse_line(&String::from_utf8_lossy(&line[..pos]), &mut out);
        }
        out
    }

    /// Flush a trailing line that never got its newline
    pub fn finish(&mut self) -> Vec<Result<StreamEvent>> {
        let mut out = Vec::new();
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            parse_line(&String::from_utf8_lossy(&line), &mut out);
        }
        out
    }

    /// Bytes held back waiting for a newline
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

fn parse_line(raw: &str, out: &mut Vec<Result<StreamEvent>>) {
    let line = raw.trim_end_matches('\r');
    if line.trim().is_empty() {
        return;
    }

    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        log::debug!("Ignoring non-data stream line: {}", preview(line));
        return;
    };
    let payload = payload.trim();
    if payload.is_empty() {
        return;
    }

    let frame: WireFrame = match serde_json::from_str(payload) {
        Ok(frame) => frame,
        // Content sniffing: an HTML error page where frames were expected.
        Err(_) if looks_like_markup(payload) => {
            out.push(Err(ChatError::UpstreamFault(format!(
                "expected a JSON event, got markup: {}",
                preview(payload)
            ))));
            return;
        }
        Err(e) => {
            log::warn!("Skipping malformed stream frame ({}): {}", e, preview(payload));
            return;
        }
    };

    if let Some(message) = frame.error {
        out.push(Err(ChatError::Backend {
            message,
            category: frame.kind,
        }));
        return;
    }
    if let Some(chunk) = frame.chunk.filter(|c| !c.is_empty()) {
        out.push(Ok(StreamEvent::Chunk { chunk }));
    }
    if frame.done == Some(true) {
        out.push(Ok(StreamEvent::done()));
    }
}

fn looks_like_markup(payload: &str) -> bool {
    payload.trim_start().starts_with('<')
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        out.push_str("...");
    }
    out
}

struct DecodeState {
    source: ByteStream,
    parser: StreamParser,
    pending: VecDeque<Result<StreamEvent>>,
    eof: bool,
    terminated: bool,
}

/// Lazily decode a byte stream into protocol events.
///
/// Each call starts from a fresh parser.
pub fn decode_stream(source: ByteStream) -> EventStream {
    let state = DecodeState {
        source,
        parser: StreamParser::new(),
        pending: VecDeque::new(),
        eof: false,
        terminated: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if state.terminated {
                return None;
            }
            if let Some(item) = state.pending.pop_front() {
                if matches!(item, Ok(StreamEvent::Done { .. }) | Err(_)) {
                    state.terminated = true;
                }
                return Some((item, state));
            }
            if state.eof {
                return None;
            }
            match state.source.next().await {
                Some(Ok(bytes)) => {
                    let events = state.parser.push(&bytes);
                    state.pending.extend(events);
                }
                Some(Err(e)) => state.pending.push_back(Err(e)),
                None => {
                    state.eof = true;
                    let events = state.parser.finish();
                    state.pending.extend(events);
                }
            }
        }
    }))
}

/// Extract the full answer from a non-streaming JSON response.
pub fn content_from_json(value: &Value) -> Result<String> {
    if let Some(message) = value.get("error").and_then(Value::as_str) {
        return Err(ChatError::Backend {
            message: message.to_string(),
            category: value.get("type").and_then(Value::as_str).map(String::from),
        });
    }
    ["response", "content", "answer", "message"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(String::from)
        .ok_or_else(|| ChatError::Protocol("JSON response carried no answer text".to_string()))
}
