//! Request/response client with credential injection
//!
//! Every non-streaming call goes through [`ApiClient::execute`], which
//! attaches the bearer token and unwraps the backend's response envelope.

use marknote_core::types::is_success_code;
use marknote_core::{Result, TransportFault};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

use crate::token_store::TokenStore;
use crate::transport::{ApiRequest, Transport};

/// Shared handle to the transport and credentials
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// Create a client over a transport and a token store
    pub fn new(transport: Arc<dyn Transport>, tokens: Arc<dyn TokenStore>) -> Self {
        Self { transport, tokens }
    }

    /// The underlying transport
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// The credential source
    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Send a request and return the whole response body
    ///
    /// The stored access token is attached unless the request already
    /// carries one. A body whose `code` is neither 200 nor 0 is a
    /// [`TransportFault::Rejected`].
    pub async fn execute(&self, mut request: ApiRequest) -> Result<Value> {
        if request.bearer.is_none() {
            request.bearer = self.tokens.access_token();
        }

        let body = self.transport.send(request).await?;
        Ok(check_envelope(body)?)
    }

    /// Send a request and decode the envelope's `data` field
    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let body = self.execute(request).await?;
        decode_data(body)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("authenticated", &self.tokens.is_authenticated())
            .finish()
    }
}

/// Reject envelopes that carry a business error code
///
/// Bodies without a numeric `code` are passed through untouched.
pub fn check_envelope(body: Value) -> std::result::Result<Value, TransportFault> {
    let Some(code) = body.get("code").and_then(Value::as_i64) else {
        return Ok(body);
    };

    if is_success_code(code) {
        return Ok(body);
    }

    let message = body
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or("Error")
        .to_string();
    error!("Business error {}: {}", code, message);
    Err(TransportFault::Rejected { code, message })
}

fn decode_data<T: DeserializeOwned>(mut body: Value) -> Result<T> {
    let data = body
        .get_mut("data")
        .map(Value::take)
        .unwrap_or(Value::Null);
    serde_json::from_value(data)
        .map_err(|e| TransportFault::Decode(format!("unexpected response data: {}", e)).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use crate::token_store::MemoryTokenStore;
    use marknote_core::Error;
    use serde_json::json;

    #[test]
    fn test_check_envelope() {
        assert!(check_envelope(json!({"code": 200, "data": "x"})).is_ok());
        assert!(check_envelope(json!({"code": 0})).is_ok());
        assert!(check_envelope(json!("bare text")).is_ok());

        let fault = check_envelope(json!({"code": 500, "message": "boom"})).unwrap_err();
        assert_eq!(
            fault,
            TransportFault::Rejected {
                code: 500,
                message: "boom".to_string()
            }
        );

        let fault = check_envelope(json!({"code": 400})).unwrap_err();
        assert_eq!(fault.to_string(), "Error");
    }

    #[tokio::test]
    async fn test_execute_injects_stored_token() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_reply(Ok(json!({"code": 200, "data": [1, 2]})));
        let api = ApiClient::new(transport.clone(), Arc::new(MemoryTokenStore::with_token("tok")));

        let data: Vec<i32> = api.fetch(ApiRequest::get("/numbers")).await.unwrap();
        assert_eq!(data, vec![1, 2]);

        let sent = transport.sent_requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].bearer.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_execute_without_token_sends_anonymous() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_reply(Ok(json!({"code": 200, "data": null})));
        let api = ApiClient::new(transport.clone(), Arc::new(MemoryTokenStore::new()));

        api.execute(ApiRequest::post("/auth/login")).await.unwrap();
        assert!(transport.sent_requests()[0].bearer.is_none());
    }

    #[tokio::test]
    async fn test_fetch_reports_business_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_reply(Ok(json!({"code": 1002, "message": "note not found"})));
        let api = ApiClient::new(transport, Arc::new(MemoryTokenStore::new()));

        let err = api.fetch::<Value>(ApiRequest::get("/notes/9")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportFault::Rejected { code: 1002, .. })
        ));
    }
}
