//! Scripted transport for unit tests

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use marknote_core::TransportFault;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;

use crate::transport::{ApiRequest, ByteStream, StreamRequest, Transport};

type Chunk = Result<Bytes, TransportFault>;

/// Replays queued responses and records what was sent
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    streams: Mutex<VecDeque<Result<Vec<Chunk>, TransportFault>>>,
    replies: Mutex<VecDeque<Result<Value, TransportFault>>>,
    opened: Mutex<Vec<StreamRequest>>,
    sent: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a stream whose body yields these text chunks
    pub(crate) fn push_stream(&self, chunks: &[&str]) {
        let chunks = chunks
            .iter()
            .map(|c| Ok(Bytes::from(c.to_string())))
            .collect();
        self.streams.lock().push_back(Ok(chunks));
    }

    /// Queue a stream with explicit chunk results
    pub(crate) fn push_stream_chunks(&self, chunks: Vec<Chunk>) {
        self.streams.lock().push_back(Ok(chunks));
    }

    /// Queue a failure to open the stream
    pub(crate) fn push_stream_fault(&self, fault: TransportFault) {
        self.streams.lock().push_back(Err(fault));
    }

    /// Queue a request/response reply
    pub(crate) fn push_reply(&self, reply: Result<Value, TransportFault>) {
        self.replies.lock().push_back(reply);
    }

    pub(crate) fn opened_streams(&self) -> Vec<StreamRequest> {
        self.opened.lock().clone()
    }

    pub(crate) fn sent_requests(&self) -> Vec<ApiRequest> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open_stream(&self, request: StreamRequest) -> Result<ByteStream, TransportFault> {
        self.opened.lock().push(request);
        let script = self
            .streams
            .lock()
            .pop_front()
            .unwrap_or(Err(TransportFault::Connection("no scripted stream".to_string())));
        script.map(|chunks| stream::iter(chunks).boxed())
    }

    async fn send(&self, request: ApiRequest) -> Result<Value, TransportFault> {
        self.sent.lock().push(request);
        self.replies
            .lock()
            .pop_front()
            .unwrap_or(Err(TransportFault::Connection("no scripted reply".to_string())))
    }
}
