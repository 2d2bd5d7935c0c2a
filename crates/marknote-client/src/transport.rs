//! Transport layer
//!
//! [`Transport`] is the seam between the client logic and the network.
//! [`HttpTransport`] is the reqwest-backed implementation; tests swap in
//! scripted transports.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use marknote_core::{Result, TransportFault};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::ClientConfig;

/// Chunked response body of a streaming request
pub type ByteStream = BoxStream<'static, std::result::Result<Bytes, TransportFault>>;

/// HTTP method of a request/response call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// Request body with its content type
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    /// No body
    #[default]
    Empty,
    /// Serialized as `application/json`
    Json(Value),
    /// Sent verbatim as `text/plain`
    Text(String),
}

impl RequestBody {
    /// Content type header value, if the body has one
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::Empty => None,
            Self::Json(_) => Some("application/json"),
            Self::Text(_) => Some("text/plain"),
        }
    }
}

/// A streaming request; always a POST with a bearer token
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub path: String,
    pub bearer: String,
    pub body: RequestBody,
}

impl StreamRequest {
    /// Create a streaming request
    pub fn new(path: impl Into<String>, bearer: impl Into<String>, body: RequestBody) -> Self {
        Self {
            path: path.into(),
            bearer: bearer.into(),
            body,
        }
    }
}

/// An ordinary request/response call
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub bearer: Option<String>,
}

impl ApiRequest {
    /// Create a request with no body, query or token
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Attach a JSON body
    pub fn json(mut self, value: Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    /// Attach a plain-text body
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = RequestBody::Text(text.into());
        self
    }

    /// Attach a prepared body
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Add a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Add a query parameter only when a value is present
    pub fn query_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Authenticate with a bearer token
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// Network access used by the client
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a streaming request and return its body once headers arrive
    ///
    /// Non-success statuses are reported as faults before any body is read.
    async fn open_stream(&self, request: StreamRequest) -> std::result::Result<ByteStream, TransportFault>;

    /// Perform a request/response call and return the decoded body
    async fn send(&self, request: ApiRequest) -> std::result::Result<Value, TransportFault>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a transport from client configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder
            .build()
            .map_err(|e| marknote_core::Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open_stream(&self, request: StreamRequest) -> std::result::Result<ByteStream, TransportFault> {
        let url = self.url(&request.path);
        debug!("Opening stream: POST {}", url);

        // No timeout here: a response may legitimately stream for minutes.
        let builder = self
            .client
            .post(&url)
            .bearer_auth(&request.bearer)
            .header(ACCEPT, "text/event-stream");

        let response = with_body(builder, request.body)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        debug!("Stream response status: {}", status);
        if !status.is_success() {
            return Err(TransportFault::from_status(status.as_u16()));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(classify_error))
            .boxed())
    }

    async fn send(&self, request: ApiRequest) -> std::result::Result<Value, TransportFault> {
        let url = self.url(&request.path);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        debug!("Sending {} {}", method, url);

        let mut builder = self
            .client
            .request(method, &url)
            .timeout(self.timeout)
            .header(ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        let response = with_body(builder, request.body)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            error!("Request to {} failed: {}", url, status);
            return Err(TransportFault::from_status(status.as_u16()));
        }

        let text = response.text().await.map_err(classify_error)?;
        Ok(decode_body(&text))
    }
}

fn with_body(builder: reqwest::RequestBuilder, body: RequestBody) -> reqwest::RequestBuilder {
    let content_type = body.content_type();
    let builder = match content_type {
        Some(value) => builder.header(CONTENT_TYPE, value),
        None => builder,
    };

    match body {
        RequestBody::Empty => builder,
        RequestBody::Json(value) => builder.body(value.to_string()),
        RequestBody::Text(text) => builder.body(text),
    }
}

/// JSON when the body parses as JSON, otherwise the raw text
fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn classify_error(err: reqwest::Error) -> TransportFault {
    if err.is_timeout() {
        return TransportFault::Timeout;
    }
    if let Some(status) = err.status() {
        return TransportFault::from_status(status.as_u16());
    }
    if err.is_decode() {
        return TransportFault::Decode(err.to_string());
    }
    TransportFault::Connection(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = ApiRequest::get("/notes")
            .query("page", 1)
            .query_opt("keyword", Some("rust"))
            .query_opt("folderId", None::<i64>)
            .bearer("t");

        assert_eq!(request.method, Method::Get);
        assert_eq!(
            request.query,
            vec![
                ("page".to_string(), "1".to_string()),
                ("keyword".to_string(), "rust".to_string())
            ]
        );
        assert_eq!(request.bearer.as_deref(), Some("t"));
    }

    #[test]
    fn test_body_content_types() {
        assert_eq!(RequestBody::Empty.content_type(), None);
        assert_eq!(RequestBody::Json(json!({})).content_type(), Some("application/json"));
        assert_eq!(RequestBody::Text("x".into()).content_type(), Some("text/plain"));
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(""), Value::Null);
        assert_eq!(decode_body(r#"{"code":200}"#), json!({"code": 200}));
        assert_eq!(decode_body("plain words"), json!("plain words"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let config = ClientConfig {
            base_url: "http://localhost:8080/api/".to_string(),
            ..Default::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.url("/ai/chat"), "http://localhost:8080/api/ai/chat");
    }
}
