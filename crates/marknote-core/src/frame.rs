//! Event frame parsing
//!
//! Classifies the lines produced by [`LineBuffer`](crate::stream::LineBuffer)
//! for the backend's AI streaming endpoints:
//! ```text
//! event: message
//! data:{"type":"content","content":"Hel"}
//!
//! data:{"type":"done"}
//! ```

use serde::Deserialize;
use serde_json::Value;

/// Prefix of control lines (acknowledged, never acted on)
pub const EVENT_PREFIX: &str = "event:";

/// Prefix of payload lines
pub const DATA_PREFIX: &str = "data:";

/// One decoded unit of a streamed AI response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text to append to the response in progress
    Content(String),
    /// The backend gave up; terminal
    Error(String),
    /// The response is complete; terminal
    Done,
}

impl Frame {
    /// Whether this frame ends the session
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Content(_))
    }
}

/// What a single line turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// Empty or whitespace-only
    Blank,
    /// An `event:` line
    Control,
    /// A `data:` line carrying a recognised frame
    Frame(Frame),
    /// A `data:` line whose payload could not be used
    Malformed(String),
    /// Anything else
    Other,
}

impl ParsedLine {
    /// The frame carried by this line, if any
    pub fn into_frame(self) -> Option<Frame> {
        match self {
            Self::Frame(frame) => Some(frame),
            _ => None,
        }
    }
}

/// Stateless parser for the `event:`/`data:` line protocol
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameParser;

impl FrameParser {
    /// Create a new frame parser
    pub fn new() -> Self {
        Self
    }

    /// Classify one complete line
    pub fn classify(&self, line: &str) -> ParsedLine {
        if line.trim().is_empty() {
            return ParsedLine::Blank;
        }

        if line.starts_with(EVENT_PREFIX) {
            return ParsedLine::Control;
        }

        // Exactly the five prefix bytes are removed; JSON decoding skips any
        // whitespace that follows.
        match line.strip_prefix(DATA_PREFIX) {
            Some(payload) => Self::parse_payload(payload),
            None => ParsedLine::Other,
        }
    }

    /// Parse one line into a frame, skipping everything that is not one
    pub fn parse(&self, line: &str) -> Option<Frame> {
        self.classify(line).into_frame()
    }

    fn parse_payload(payload: &str) -> ParsedLine {
        let raw = match serde_json::from_str::<RawFrame>(payload) {
            Ok(raw) => raw,
            Err(e) => return ParsedLine::Malformed(format!("invalid frame payload: {}", e)),
        };

        match raw.kind.as_deref() {
            Some("content") => ParsedLine::Frame(Frame::Content(content_text(raw.content))),
            Some("error") => ParsedLine::Frame(Frame::Error(match raw.error {
                Some(Value::String(message)) if !message.is_empty() => message,
                _ => "stream error".to_string(),
            })),
            Some("done") => ParsedLine::Frame(Frame::Done),
            Some(other) => ParsedLine::Malformed(format!("unknown frame type: {}", other)),
            None => ParsedLine::Malformed("frame payload has no type".to_string()),
        }
    }
}

/// Text carried by a content frame; non-string values keep their JSON form
fn content_text(content: Option<Value>) -> String {
    match content {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
    }
}

// =============================================================================
// Wire Structures
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: Option<String>,
    content: Option<Value>,
    error: Option<Value>,
}
