//! Delivery of streamed text to the caller
//!
//! Both the streaming session and the fallback replay report through a
//! [`ResponseSink`]. [`Delivery`] sits in front of the sink and guarantees
//! that exactly one terminal callback reaches it, after every message.

use tokio::sync::mpsc::UnboundedSender;

/// Receiver of an AI response as it is produced
pub trait ResponseSink: Send {
    /// A fragment of text to append
    fn on_message(&mut self, text: &str);

    /// The response finished successfully
    fn on_complete(&mut self);

    /// The response failed
    fn on_error(&mut self, message: &str);
}

/// Event form of the sink callbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Message(String),
    Complete,
    Error(String),
}

/// Sink built from three closures
pub struct Callbacks<M, C, E> {
    on_message: M,
    on_complete: C,
    on_error: E,
}

impl<M, C, E> Callbacks<M, C, E>
where
    M: FnMut(&str) + Send,
    C: FnMut() + Send,
    E: FnMut(&str) + Send,
{
    pub fn new(on_message: M, on_complete: C, on_error: E) -> Self {
        Self {
            on_message,
            on_complete,
            on_error,
        }
    }
}

impl<M, C, E> ResponseSink for Callbacks<M, C, E>
where
    M: FnMut(&str) + Send,
    C: FnMut() + Send,
    E: FnMut(&str) + Send,
{
    fn on_message(&mut self, text: &str) {
        (self.on_message)(text)
    }

    fn on_complete(&mut self) {
        (self.on_complete)()
    }

    fn on_error(&mut self, message: &str) {
        (self.on_error)(message)
    }
}

/// Records every callback in order
impl ResponseSink for Vec<StreamEvent> {
    fn on_message(&mut self, text: &str) {
        self.push(StreamEvent::Message(text.to_string()));
    }

    fn on_complete(&mut self) {
        self.push(StreamEvent::Complete);
    }

    fn on_error(&mut self, message: &str) {
        self.push(StreamEvent::Error(message.to_string()));
    }
}

/// Forwards callbacks to a renderer task; a closed receiver drops them
impl ResponseSink for UnboundedSender<StreamEvent> {
    fn on_message(&mut self, text: &str) {
        let _ = self.send(StreamEvent::Message(text.to_string()));
    }

    fn on_complete(&mut self) {
        let _ = self.send(StreamEvent::Complete);
    }

    fn on_error(&mut self, message: &str) {
        let _ = self.send(StreamEvent::Error(message.to_string()));
    }
}

/// Where a delivery ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Open,
    Completed,
    Failed,
    /// Stopped by the caller; no terminal callback was sent
    Cancelled,
}

/// Guard enforcing the one-terminal-callback rule on a sink
pub struct Delivery<'a> {
    sink: &'a mut dyn ResponseSink,
    state: DeliveryState,
    messages: usize,
}

impl<'a> Delivery<'a> {
    /// Wrap a sink
    pub fn new(sink: &'a mut dyn ResponseSink) -> Self {
        Self {
            sink,
            state: DeliveryState::Open,
            messages: 0,
        }
    }

    /// Forward a fragment; dropped once the delivery has ended
    pub fn message(&mut self, text: &str) -> bool {
        if !self.is_open() {
            return false;
        }
        self.messages += 1;
        self.sink.on_message(text);
        true
    }

    /// Signal success; ignored if the delivery has already ended
    pub fn complete(&mut self) {
        if self.is_open() {
            self.state = DeliveryState::Completed;
            self.sink.on_complete();
        }
    }

    /// Signal failure; ignored if the delivery has already ended
    pub fn error(&mut self, message: &str) {
        if self.is_open() {
            self.state = DeliveryState::Failed;
            self.sink.on_error(message);
        }
    }

    /// End silently: nothing further reaches the sink
    pub fn cancel(&mut self) {
        if self.is_open() {
            self.state = DeliveryState::Cancelled;
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == DeliveryState::Open
    }

    pub fn state(&self) -> DeliveryState {
        self.state
    }

    /// Number of fragments forwarded so far
    pub fn messages_delivered(&self) -> usize {
        self.messages
    }
}
