//! Streaming session
//!
//! Drives one streaming request from opening the connection to the
//! terminal frame:
//!
//! ```text
//! Opening ──404──────────────────────────▶ Unavailable
//!    │ └─401/403/other/fault──────────────▶ Failed
//!    ▼
//! Streaming ──done frame / end of body───▶ Completed
//!    └──────error frame / read fault─────▶ Failed
//! ```
//!
//! `Unavailable` is never reported to the sink; the dispatcher turns it
//! into a fallback call.

use futures::StreamExt;
use marknote_core::{Frame, FrameParser, LineBuffer, ParsedLine, TransportFault};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::delivery::Delivery;
use crate::operation::{Operation, AUTH_REQUIRED, NETWORK_ERROR};
use crate::token_store::mask_token;
use crate::transport::{RequestBody, StreamRequest, Transport};

/// How a session (or fallback run) ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// `on_complete` was delivered
    Completed,
    /// `on_error` was delivered
    Failed,
    /// The streaming endpoint is missing; nothing was delivered
    Unavailable,
    /// Stopped by the caller; no terminal callback was delivered
    Cancelled,
}

impl SessionOutcome {
    /// Metrics label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unavailable => "unavailable",
            Self::Cancelled => "cancelled",
        }
    }
}

/// One streaming request for one operation
pub struct StreamSession {
    transport: Arc<dyn Transport>,
    operation: Operation,
    parser: FrameParser,
}

impl StreamSession {
    /// Create a session for an operation
    pub fn new(transport: Arc<dyn Transport>, operation: Operation) -> Self {
        Self {
            transport,
            operation,
            parser: FrameParser::new(),
        }
    }

    /// Run the session to its end
    ///
    /// Content frames are forwarded as soon as their line completes. A
    /// body that ends without a terminal frame counts as completed.
    pub async fn run(
        &self,
        token: Option<&str>,
        body: RequestBody,
        delivery: &mut Delivery<'_>,
        cancel: &CancellationToken,
    ) -> SessionOutcome {
        let Some(token) = token else {
            warn!("No access token for {} stream", self.operation);
            delivery.error(AUTH_REQUIRED);
            return SessionOutcome::Failed;
        };

        let path = self.operation.stream_path();
        debug!("Opening {} stream at {} with token {}", self.operation, path, mask_token(token));
        let request = StreamRequest::new(path, token, body);

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Self::cancelled(delivery),
            opened = self.transport.open_stream(request) => opened,
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(fault) => return self.fail(fault, delivery),
        };

        let mut lines = LineBuffer::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Self::cancelled(delivery),
                next = stream.next() => next,
            };

            let chunk = match next {
                None => {
                    let dropped = lines.finish();
                    if dropped > 0 {
                        debug!("Discarding {} bytes of unterminated trailing line", dropped);
                    }
                    debug!("{} stream closed without a done frame", self.operation);
                    delivery.complete();
                    return SessionOutcome::Completed;
                }
                Some(Err(fault)) => return self.fail(fault, delivery),
                Some(Ok(chunk)) => chunk,
            };

            for line in lines.feed(&chunk) {
                if let Some(outcome) = self.handle_line(&line, delivery) {
                    return outcome;
                }
            }
        }
    }

    /// Act on one line; returns the outcome if it ended the session
    fn handle_line(&self, line: &str, delivery: &mut Delivery<'_>) -> Option<SessionOutcome> {
        match self.parser.classify(line) {
            ParsedLine::Blank => None,
            ParsedLine::Control => {
                debug!("Skipping control line: {}", line);
                None
            }
            ParsedLine::Other => {
                debug!("Ignoring unrecognised line: {}", line);
                None
            }
            ParsedLine::Malformed(reason) => {
                warn!("Skipping malformed frame ({}): {}", reason, line);
                metrics::counter!("marknote_malformed_frames_total", "operation" => self.operation.label())
                    .increment(1);
                None
            }
            ParsedLine::Frame(Frame::Content(text)) => {
                delivery.message(&text);
                None
            }
            ParsedLine::Frame(Frame::Error(message)) => {
                error!("{} stream reported an error: {}", self.operation, message);
                delivery.error(&message);
                Some(SessionOutcome::Failed)
            }
            ParsedLine::Frame(Frame::Done) => {
                debug!("{} stream done", self.operation);
                delivery.complete();
                Some(SessionOutcome::Completed)
            }
        }
    }

    fn fail(&self, fault: TransportFault, delivery: &mut Delivery<'_>) -> SessionOutcome {
        let message = match fault {
            // Falling back after partial output would repeat it
            TransportFault::NotFound if delivery.messages_delivered() == 0 => {
                info!("{} streaming endpoint not available", self.operation);
                return SessionOutcome::Unavailable;
            }
            TransportFault::Unauthorized => AUTH_REQUIRED.to_string(),
            TransportFault::Forbidden => self.operation.permission_denied_message(),
            TransportFault::Status(status) => format!("request failed: {}", status),
            other => {
                let message = other.to_string();
                if message.is_empty() {
                    NETWORK_ERROR.to_string()
                } else {
                    message
                }
            }
        };

        error!("{} stream failed: {}", self.operation, message);
        delivery.error(&message);
        SessionOutcome::Failed
    }

    fn cancelled(delivery: &mut Delivery<'_>) -> SessionOutcome {
        debug!("Stream cancelled by caller");
        delivery.cancel();
        SessionOutcome::Cancelled
    }
}
