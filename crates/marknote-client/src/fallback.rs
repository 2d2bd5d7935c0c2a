//! Fallback for deployments without streaming endpoints
//!
//! Issues one request/response call, pulls the text out of whichever
//! response shape the backend used, and replays it one character at a
//! time so the caller sees the same callback sequence as a real stream.

use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::api::ApiClient;
use crate::delivery::Delivery;
use crate::operation::Operation;
use crate::session::SessionOutcome;
use crate::transport::{ApiRequest, RequestBody};

/// Pulls the response text out of one possible body shape
pub type Extractor = fn(&Value) -> Option<String>;

/// Chat replies: `data.response`, then `response`, then `data`
pub const CHAT_EXTRACTORS: &[Extractor] = &[nested_response, direct_response, data_field];

/// Enhance and summarize replies: `data`, then the whole body
pub const TEXT_EXTRACTORS: &[Extractor] = &[data_field, whole_body];

/// `{"data": {"response": ...}}`
pub fn nested_response(body: &Value) -> Option<String> {
    body.get("data")
        .and_then(|data| data.get("response"))
        .and_then(render)
}

/// `{"response": ...}`
pub fn direct_response(body: &Value) -> Option<String> {
    body.get("response").and_then(render)
}

/// `{"data": ...}`, stringified when it is not text
pub fn data_field(body: &Value) -> Option<String> {
    body.get("data").and_then(render)
}

/// The body itself
pub fn whole_body(body: &Value) -> Option<String> {
    render(body)
}

/// Try each extractor in order; the first hit wins
pub fn extract_text(extractors: &[Extractor], body: &Value) -> Option<String> {
    extractors.iter().find_map(|extract| extract(body))
}

/// Text form of a value, or `None` for empty values
fn render(value: &Value) -> Option<String> {
    if !truthy(value) {
        return None;
    }
    match value {
        Value::String(text) => Some(text.clone()),
        other => serde_json::to_string(other).ok(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Request/response path for one operation
pub struct FallbackSimulator {
    api: ApiClient,
    operation: Operation,
    char_delay: Duration,
}

impl FallbackSimulator {
    pub fn new(api: ApiClient, operation: Operation, char_delay: Duration) -> Self {
        Self {
            api,
            operation,
            char_delay,
        }
    }

    /// Fetch the full response and replay it through the delivery
    pub async fn run(
        &self,
        body: RequestBody,
        delivery: &mut Delivery<'_>,
        cancel: &CancellationToken,
    ) -> SessionOutcome {
        let request = ApiRequest::post(self.operation.fallback_path()).body(body);
        debug!("Falling back to {}", self.operation.fallback_path());

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                delivery.cancel();
                return SessionOutcome::Cancelled;
            }
            response = self.api.execute(request) => response,
        };

        let body = match response {
            Ok(body) => body,
            Err(e) => {
                let mut message = e.to_string();
                if message.is_empty() {
                    message = self.operation.failure_message();
                }
                error!("{} fallback failed: {}", self.operation, message);
                delivery.error(&message);
                return SessionOutcome::Failed;
            }
        };

        let Some(text) = extract_text(self.operation.extractors(), &body) else {
            warn!("{} fallback response matched no known shape", self.operation);
            delivery.error(&self.operation.format_mismatch_message());
            return SessionOutcome::Failed;
        };

        replay(&text, self.char_delay, delivery, cancel).await
    }
}

/// Deliver text one character at a time, pausing after each character
pub async fn replay(
    text: &str,
    delay: Duration,
    delivery: &mut Delivery<'_>,
    cancel: &CancellationToken,
) -> SessionOutcome {
    let mut buf = [0u8; 4];
    for ch in text.chars() {
        delivery.message(ch.encode_utf8(&mut buf));
        if !pace(delay, cancel).await {
            delivery.cancel();
            return SessionOutcome::Cancelled;
        }
    }

    delivery.complete();
    SessionOutcome::Completed
}

/// Wait out one delay; false if cancelled first
async fn pace(delay: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if delay.is_zero() {
        return true;
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::StreamEvent;
    use crate::testing::ScriptedTransport;
    use crate::token_store::MemoryTokenStore;
    use marknote_core::TransportFault;
    use serde_json::json;
    use std::sync::Arc;

    fn simulator(transport: Arc<ScriptedTransport>, operation: Operation) -> FallbackSimulator {
        let api = ApiClient::new(transport, Arc::new(MemoryTokenStore::with_token("tok")));
        FallbackSimulator::new(api, operation, Duration::from_millis(20))
    }

    async fn run(sim: &FallbackSimulator, cancel: &CancellationToken) -> (SessionOutcome, Vec<StreamEvent>) {
        let mut events: Vec<StreamEvent> = Vec::new();
        let outcome = {
            let mut delivery = Delivery::new(&mut events);
            sim.run(RequestBody::Text("x".into()), &mut delivery, cancel).await
        };
        (outcome, events)
    }

    #[test]
    fn test_chat_extractor_precedence() {
        let nested = json!({"code": 200, "data": {"response": "nested"}, "response": "direct"});
        assert_eq!(extract_text(CHAT_EXTRACTORS, &nested).as_deref(), Some("nested"));

        let direct = json!({"response": "direct", "data": "data"});
        assert_eq!(extract_text(CHAT_EXTRACTORS, &direct).as_deref(), Some("direct"));

        let object = json!({"data": {"conversationId": "c1"}});
        assert_eq!(
            extract_text(CHAT_EXTRACTORS, &object).as_deref(),
            Some(r#"{"conversationId":"c1"}"#)
        );

        assert_eq!(extract_text(CHAT_EXTRACTORS, &json!({"code": 200, "data": null})), None);
        assert_eq!(extract_text(CHAT_EXTRACTORS, &json!({"data": {"response": ""}})), Some("{\"response\":\"\"}".to_string()));
    }

    #[test]
    fn test_text_extractor_precedence() {
        assert_eq!(
            extract_text(TEXT_EXTRACTORS, &json!({"code": 0, "data": "better"})).as_deref(),
            Some("better")
        );
        assert_eq!(
            extract_text(TEXT_EXTRACTORS, &json!("plain body")).as_deref(),
            Some("plain body")
        );
        assert_eq!(extract_text(TEXT_EXTRACTORS, &Value::Null), None);
        assert_eq!(extract_text(TEXT_EXTRACTORS, &json!("")), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replays_characters_then_completes() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_reply(Ok(json!({"code": 200, "data": {"response": "hi"}})));
        let sim = simulator(transport.clone(), Operation::Chat);

        let started = tokio::time::Instant::now();
        let (outcome, events) = run(&sim, &CancellationToken::new()).await;

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(
            events,
            vec![
                StreamEvent::Message("h".to_string()),
                StreamEvent::Message("i".to_string()),
                StreamEvent::Complete,
            ]
        );
        assert!(started.elapsed() >= Duration::from_millis(40));

        let sent = transport.sent_requests();
        assert_eq!(sent[0].path, "/ai/chat");
        assert_eq!(sent[0].bearer.as_deref(), Some("tok"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_multibyte_characters_stay_whole() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_reply(Ok(json!({"data": "笔记"})));
        let sim = simulator(transport, Operation::Summarize);

        let (_, events) = run(&sim, &CancellationToken::new()).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Message("笔".to_string()),
                StreamEvent::Message("记".to_string()),
                StreamEvent::Complete,
            ]
        );
    }

    #[tokio::test]
    async fn test_shape_mismatch() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_reply(Ok(json!({"code": 200, "data": null})));
        let sim = simulator(transport, Operation::Chat);

        let (outcome, events) = run(&sim, &CancellationToken::new()).await;
        assert_eq!(outcome, SessionOutcome::Failed);
        assert_eq!(
            events,
            vec![StreamEvent::Error("received a chat response in an unexpected format".to_string())]
        );
    }

    #[tokio::test]
    async fn test_call_failure_reports_message() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_reply(Ok(json!({"code": 500, "message": "quota exceeded"})));
        transport.push_reply(Err(TransportFault::Connection(String::new())));
        let sim = simulator(transport, Operation::Enhance);

        let (_, events) = run(&sim, &CancellationToken::new()).await;
        assert_eq!(events, vec![StreamEvent::Error("quota exceeded".to_string())]);

        let (_, events) = run(&sim, &CancellationToken::new()).await;
        assert_eq!(events, vec![StreamEvent::Error("enhance request failed".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_replay() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_reply(Ok(json!({"data": "abcdef"})));
        let sim = simulator(transport, Operation::Enhance);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            canceller.cancel();
        });

        let (outcome, events) = run(&sim, &cancel).await;
        assert_eq!(outcome, SessionOutcome::Cancelled);
        assert_eq!(
            events,
            vec![
                StreamEvent::Message("a".to_string()),
                StreamEvent::Message("b".to_string()),
            ]
        );
    }
}
