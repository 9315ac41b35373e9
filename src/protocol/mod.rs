//! Parser for the upstream's line-oriented response protocol
//!
//! Chat responses arrive as newline-separated, tag-prefixed lines:
//!
//! ```text
//! f:{"messageId":"msg-123"}
//! 0:"Hello "
//! 0:"world"
//! e:{"finishReason":"stop"}
//! ```
//!
//! `f:` opens the message, `0:` carries a quoted content fragment, `e:`
//! closes it. Content lines before the opening `f:` are dropped, everything
//! after `e:` is ignored, and unknown tags never error. The tokenizer works
//! both on complete bodies and on arbitrary byte chunks, reassembling lines
//! split across chunk boundaries.

use serde::Deserialize;

/// A typed event produced by the protocol tokenizer.
///
/// Per parse the sequence holds: at most one [`MessageStart`], zero or more
/// [`ContentChunk`]s (only after the start), and at most one terminal
/// [`Finish`].
///
/// [`MessageStart`]: ProtocolEvent::MessageStart
/// [`ContentChunk`]: ProtocolEvent::ContentChunk
/// [`Finish`]: ProtocolEvent::Finish
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// An `f:` line opened the message.
    MessageStart { message_id: String },
    /// A `0:` line carried one unescaped fragment of assistant text.
    ContentChunk { text: String },
    /// An `e:` line closed the message; reason is empty if none was sent.
    Finish { reason: String },
}

#[derive(Debug, Deserialize)]
struct MessageStartPayload {
    #[serde(rename = "messageId")]
    message_id: String,
}

#[derive(Debug, Deserialize)]
struct FinishPayload {
    #[serde(rename = "finishReason", default)]
    finish_reason: String,
}

/// Streaming tokenizer for the tag-prefixed line protocol.
///
/// # Example
/// ```
/// use skybridge::protocol::{LineParser, ProtocolEvent};
///
/// let body = "f:{\"messageId\":\"abc\"}\n0:\"Hi\"\ne:{\"finishReason\":\"stop\"}\n";
/// let events = LineParser::parse(body);
/// assert_eq!(events.len(), 3);
/// assert_eq!(events[1], ProtocolEvent::ContentChunk { text: "Hi".into() });
/// ```
#[derive(Debug, Default)]
pub struct LineParser {
    /// Accumulated incomplete line data from previous chunks
    incomplete: String,
    /// Set once an `f:` line opened the message
    started: bool,
    /// Set once an `e:` line closed the message
    finished: bool,
}

impl LineParser {
    /// Create a new tokenizer in its initial state
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a MessageStart has been emitted
    pub fn has_started(&self) -> bool {
        self.started
    }

    /// True once a Finish has been emitted; all further input is discarded
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed raw bytes into the tokenizer and return the events completed by
    /// this chunk.
    ///
    /// Incomplete trailing data is retained for the next call; invalid UTF-8
    /// is replaced rather than rejected.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<ProtocolEvent> {
        if self.finished {
            return Vec::new();
        }

        let text = String::from_utf8_lossy(bytes);
        self.incomplete.push_str(&text);

        let mut events = Vec::new();
        while let Some(newline_pos) = self.incomplete.find('\n') {
            let line: String = self.incomplete.drain(..=newline_pos).collect();
            if let Some(event) = self.dispatch(line.trim()) {
                events.push(event);
            }
            if self.finished {
                self.incomplete.clear();
                break;
            }
        }

        events
    }

    /// Flush the trailing unterminated line at end of input.
    pub fn finish(&mut self) -> Vec<ProtocolEvent> {
        if self.finished || self.incomplete.is_empty() {
            self.incomplete.clear();
            return Vec::new();
        }
        let line = std::mem::take(&mut self.incomplete);
        self.dispatch(line.trim()).into_iter().collect()
    }

    /// Run the tokenizer over a complete response body.
    pub fn parse(body: &str) -> Vec<ProtocolEvent> {
        let mut parser = Self::new();
        let mut events = parser.feed(body.as_bytes());
        events.extend(parser.finish());
        events
    }

    /// Single-line dispatch: one arm per known tag, default ignore.
    fn dispatch(&mut self, line: &str) -> Option<ProtocolEvent> {
        if let Some(payload) = line.strip_prefix("f:") {
            return self.on_message_start(payload);
        }
        if line.starts_with("0:\"") {
            return self.on_content(line);
        }
        if let Some(payload) = line.strip_prefix("e:") {
            return self.on_finish(payload);
        }
        None
    }

    fn on_message_start(&mut self, payload: &str) -> Option<ProtocolEvent> {
        // At most one start per message; repeats are dropped.
        if self.started {
            return None;
        }
        let payload: MessageStartPayload = serde_json::from_str(payload).ok()?;
        self.started = true;
        Some(ProtocolEvent::MessageStart {
            message_id: payload.message_id,
        })
    }

    fn on_content(&mut self, line: &str) -> Option<ProtocolEvent> {
        // Content preceding the `f:` line is dropped silently.
        if !self.started {
            return None;
        }
        let raw = &line[3..];
        let raw = raw.strip_suffix('"').unwrap_or(raw);
        Some(ProtocolEvent::ContentChunk {
            text: unescape_content(raw),
        })
    }

    fn on_finish(&mut self, payload: &str) -> Option<ProtocolEvent> {
        let payload: FinishPayload = serde_json::from_str(payload).ok()?;
        self.finished = true;
        Some(ProtocolEvent::Finish {
            reason: payload.finish_reason,
        })
    }
}

/// Undo the two escapes the upstream applies inside content payloads, in
/// this order and nothing else.
fn unescape_content(raw: &str) -> String {
    raw.replace("\\n", "\n").replace("\\\"", "\"")
}
