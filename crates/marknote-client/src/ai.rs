//! AI capabilities
//!
//! The streaming entry points try the operation's streaming endpoint
//! first and, when the backend does not expose it, replay the plain
//! endpoint's answer through the same sink. Callers cannot tell which
//! path served them. Streaming outcomes are reported only through the
//! sink, never as an `Err`.

use marknote_core::{ChatRequest, ChatResponse, Result};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::delivery::{Delivery, ResponseSink};
use crate::fallback::FallbackSimulator;
use crate::operation::{AiTask, Operation, AUTH_REQUIRED};
use crate::session::{SessionOutcome, StreamSession};
use crate::transport::ApiRequest;

/// Default pause between replayed fallback characters
pub const DEFAULT_CHAR_DELAY: Duration = Duration::from_millis(20);

/// AI endpoints of the notes backend
#[derive(Debug, Clone)]
pub struct AiClient {
    api: ApiClient,
    char_delay: Duration,
}

impl AiClient {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            char_delay: DEFAULT_CHAR_DELAY,
        }
    }

    /// Override the fallback replay delay
    pub fn with_char_delay(mut self, delay: Duration) -> Self {
        self.char_delay = delay;
        self
    }

    // ====== Streaming ======

    /// Stream a chat reply
    pub async fn stream_chat(&self, request: ChatRequest, sink: &mut dyn ResponseSink) -> SessionOutcome {
        self.stream(AiTask::Chat(request), sink, &CancellationToken::new())
            .await
    }

    /// Stream an enhanced version of the text
    pub async fn stream_enhance_text(&self, text: impl Into<String>, sink: &mut dyn ResponseSink) -> SessionOutcome {
        self.stream(AiTask::Enhance(text.into()), sink, &CancellationToken::new())
            .await
    }

    /// Stream a summary of the content
    pub async fn stream_summarize_content(
        &self,
        content: impl Into<String>,
        sink: &mut dyn ResponseSink,
    ) -> SessionOutcome {
        self.stream(AiTask::Summarize(content.into()), sink, &CancellationToken::new())
            .await
    }

    /// Run any task until it ends or `cancel` fires
    ///
    /// After cancellation no further callbacks reach the sink and the
    /// response body is dropped.
    pub async fn stream(
        &self,
        task: AiTask,
        sink: &mut dyn ResponseSink,
        cancel: &CancellationToken,
    ) -> SessionOutcome {
        let operation = task.operation();
        let mut delivery = Delivery::new(sink);

        let outcome = self.dispatch(operation, &task, &mut delivery, cancel).await;

        debug!(
            "{} finished: {} ({} fragments)",
            operation,
            outcome.label(),
            delivery.messages_delivered()
        );
        metrics::counter!(
            "marknote_stream_sessions_total",
            "operation" => operation.label(),
            "outcome" => outcome.label()
        )
        .increment(1);

        outcome
    }

    async fn dispatch(
        &self,
        operation: Operation,
        task: &AiTask,
        delivery: &mut Delivery<'_>,
        cancel: &CancellationToken,
    ) -> SessionOutcome {
        let Some(token) = self.api.tokens().access_token() else {
            warn!("{} requested without a stored access token", operation);
            delivery.error(AUTH_REQUIRED);
            return SessionOutcome::Failed;
        };

        let body = match task.body() {
            Ok(body) => body,
            Err(e) => {
                delivery.error(&e.to_string());
                return SessionOutcome::Failed;
            }
        };

        let session = StreamSession::new(self.api.transport().clone(), operation);
        let outcome = session
            .run(Some(token.as_str()), body.clone(), delivery, cancel)
            .await;
        if outcome != SessionOutcome::Unavailable {
            return outcome;
        }

        info!("Streaming {} unavailable, using request/response endpoint", operation);
        metrics::counter!("marknote_fallbacks_total", "operation" => operation.label()).increment(1);

        FallbackSimulator::new(self.api.clone(), operation, self.char_delay)
            .run(body, delivery, cancel)
            .await
    }

    // ====== Request/response ======

    /// Single chat exchange; returns the response body
    pub async fn chat(&self, request: &ChatRequest) -> Result<Value> {
        self.api
            .execute(ApiRequest::post(Operation::Chat.fallback_path()).json(serde_json::to_value(request)?))
            .await
    }

    /// Enhance text in one call
    pub async fn enhance_text(&self, text: impl Into<String>) -> Result<Value> {
        self.api
            .execute(ApiRequest::post(Operation::Enhance.fallback_path()).text(text))
            .await
    }

    /// Summarize content in one call
    pub async fn summarize_content(&self, content: impl Into<String>) -> Result<Value> {
        self.api
            .execute(ApiRequest::post(Operation::Summarize.fallback_path()).text(content))
            .await
    }

    /// Translate text into the target language
    pub async fn translate_text(&self, text: &str, target_language: &str) -> Result<Value> {
        self.api
            .execute(
                ApiRequest::post("/ai/translate")
                    .query("text", text)
                    .query("targetLanguage", target_language),
            )
            .await
    }

    /// The current user's conversation history
    pub async fn get_conversations(&self) -> Result<Vec<ChatResponse>> {
        self.api.fetch(ApiRequest::get("/ai/conversations")).await
    }

    /// Delete the current user's conversation history
    pub async fn clear_conversations(&self) -> Result<()> {
        self.api.execute(ApiRequest::delete("/ai/conversations")).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::StreamEvent;
    use crate::testing::ScriptedTransport;
    use crate::token_store::MemoryTokenStore;
    use crate::transport::{Method, RequestBody};
    use bytes::Bytes;
    use marknote_core::TransportFault;
    use serde_json::json;
    use std::sync::Arc;

    fn client(transport: Arc<ScriptedTransport>, token: Option<&str>) -> AiClient {
        let tokens = match token {
            Some(token) => MemoryTokenStore::with_token(token),
            None => MemoryTokenStore::new(),
        };
        AiClient::new(ApiClient::new(transport, Arc::new(tokens))).with_char_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_stream_chat_over_stream() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_stream(&[
            "data:{\"type\":\"content\",\"content\":\"Hi\"}\n",
            "data:{\"type\":\"done\"}\n",
        ]);
        let ai = client(transport.clone(), Some("tok"));

        let mut events: Vec<StreamEvent> = Vec::new();
        let outcome = ai
            .stream_chat(ChatRequest::new("hello").with_conversation("c1"), &mut events)
            .await;

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(events, vec![StreamEvent::Message("Hi".to_string()), StreamEvent::Complete]);

        let opened = transport.opened_streams();
        assert_eq!(
            opened[0].body,
            RequestBody::Json(json!({"message": "hello", "conversationId": "c1"}))
        );
        assert!(transport.sent_requests().is_empty());
    }

    #[tokio::test]
    async fn test_not_found_falls_back_silently() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_stream_fault(TransportFault::NotFound);
        transport.push_reply(Ok(json!({"code": 200, "data": "ok"})));
        let ai = client(transport.clone(), Some("tok"));

        let mut events: Vec<StreamEvent> = Vec::new();
        let outcome = ai.stream_enhance_text("draft", &mut events).await;

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(
            events,
            vec![
                StreamEvent::Message("o".to_string()),
                StreamEvent::Message("k".to_string()),
                StreamEvent::Complete,
            ]
        );

        let sent = transport.sent_requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, Method::Post);
        assert_eq!(sent[0].path, "/ai/enhance");
        assert_eq!(sent[0].body, RequestBody::Text("draft".to_string()));
    }

    #[tokio::test]
    async fn test_not_found_after_partial_output_skips_fallback() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_stream_chunks(vec![
            Ok(Bytes::from("data:{\"type\":\"content\",\"content\":\"hi\"}\n")),
            Err(TransportFault::NotFound),
        ]);
        transport.push_reply(Ok(json!({"data": {"response": "hi"}})));
        let ai = client(transport.clone(), Some("tok"));

        let mut events: Vec<StreamEvent> = Vec::new();
        let outcome = ai.stream_chat(ChatRequest::new("hello"), &mut events).await;

        assert_eq!(outcome, SessionOutcome::Failed);
        assert_eq!(
            events,
            vec![
                StreamEvent::Message("hi".to_string()),
                StreamEvent::Error("endpoint not found".to_string()),
            ]
        );
        assert!(transport.sent_requests().is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_stream_never_messages() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_stream_fault(TransportFault::Unauthorized);
        let ai = client(transport.clone(), Some("expired"));

        let mut events: Vec<StreamEvent> = Vec::new();
        ai.stream_summarize_content("long text", &mut events).await;

        assert_eq!(events, vec![StreamEvent::Error(AUTH_REQUIRED.to_string())]);
        assert!(transport.sent_requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_token_contacts_nothing() {
        let transport = Arc::new(ScriptedTransport::new());
        let ai = client(transport.clone(), None);

        let mut events: Vec<StreamEvent> = Vec::new();
        let outcome = ai.stream_chat(ChatRequest::new("hello"), &mut events).await;

        assert_eq!(outcome, SessionOutcome::Failed);
        assert_eq!(events, vec![StreamEvent::Error(AUTH_REQUIRED.to_string())]);
        assert!(transport.opened_streams().is_empty());
        assert!(transport.sent_requests().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_error_is_single_terminal() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_stream_fault(TransportFault::NotFound);
        transport.push_reply(Err(TransportFault::Status(502)));
        let ai = client(transport, Some("tok"));

        let mut events: Vec<StreamEvent> = Vec::new();
        let outcome = ai.stream_chat(ChatRequest::new("hello"), &mut events).await;

        assert_eq!(outcome, SessionOutcome::Failed);
        assert_eq!(events, vec![StreamEvent::Error("request failed: 502".to_string())]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_stream(&["data:{\"type\":\"content\",\"content\":\"x\"}\n"]);
        let ai = client(transport, Some("tok"));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut events: Vec<StreamEvent> = Vec::new();
        let outcome = ai
            .stream(AiTask::Enhance("draft".into()), &mut events, &cancel)
            .await;

        assert_eq!(outcome, SessionOutcome::Cancelled);
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_translate_sends_query() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_reply(Ok(json!({"code": 200, "data": "bonjour"})));
        let ai = client(transport.clone(), Some("tok"));

        let body = ai.translate_text("hello", "fr").await.unwrap();
        assert_eq!(body["data"], "bonjour");

        let sent = transport.sent_requests();
        assert_eq!(sent[0].path, "/ai/translate");
        assert_eq!(
            sent[0].query,
            vec![
                ("text".to_string(), "hello".to_string()),
                ("targetLanguage".to_string(), "fr".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_conversations() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_reply(Ok(json!({
            "code": 200,
            "data": [{"id": "m1", "conversationId": "c1", "message": "q", "response": "a"}]
        })));
        transport.push_reply(Ok(json!({"code": 200, "message": "success"})));
        let ai = client(transport.clone(), Some("tok"));

        let history = ai.get_conversations().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].response, "a");

        ai.clear_conversations().await.unwrap();
        assert_eq!(transport.sent_requests()[1].method, Method::Delete);
    }
}
