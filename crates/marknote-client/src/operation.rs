//! AI operations and their endpoints

use marknote_core::{ChatRequest, Result};
use std::fmt;

use crate::fallback::{self, Extractor};
use crate::transport::RequestBody;

/// Message for a missing token or an HTTP 401
pub const AUTH_REQUIRED: &str = "authentication required, please log in";

/// Message for a connection failure that carried no description
pub const NETWORK_ERROR: &str = "network error";

/// An AI capability with a streaming endpoint and a plain fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Chat,
    Enhance,
    Summarize,
}

impl Operation {
    /// Streaming endpoint path
    pub fn stream_path(&self) -> &'static str {
        match self {
            Self::Chat => "/ai/chat/stream",
            Self::Enhance => "/ai/enhance/stream",
            Self::Summarize => "/ai/summarize/stream",
        }
    }

    /// Request/response endpoint path
    pub fn fallback_path(&self) -> &'static str {
        match self {
            Self::Chat => "/ai/chat",
            Self::Enhance => "/ai/enhance",
            Self::Summarize => "/ai/summarize",
        }
    }

    /// Short name used in logs and metrics labels
    pub fn label(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Enhance => "enhance",
            Self::Summarize => "summarize",
        }
    }

    /// Response shapes the fallback accepts, most specific first
    pub fn extractors(&self) -> &'static [Extractor] {
        match self {
            Self::Chat => fallback::CHAT_EXTRACTORS,
            Self::Enhance | Self::Summarize => fallback::TEXT_EXTRACTORS,
        }
    }

    /// Message for an HTTP 403
    pub fn permission_denied_message(&self) -> String {
        format!("permission denied for {}", self.feature())
    }

    /// Message when the fallback call fails without a description
    pub fn failure_message(&self) -> String {
        format!("{} request failed", self.label())
    }

    /// Message when no extractor matches the fallback response
    pub fn format_mismatch_message(&self) -> String {
        format!("received a {} response in an unexpected format", self.label())
    }

    fn feature(&self) -> &'static str {
        match self {
            Self::Chat => "AI chat",
            Self::Enhance => "text enhancement",
            Self::Summarize => "summarization",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An operation together with its payload
#[derive(Debug, Clone)]
pub enum AiTask {
    Chat(ChatRequest),
    Enhance(String),
    Summarize(String),
}

impl AiTask {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Chat(_) => Operation::Chat,
            Self::Enhance(_) => Operation::Enhance,
            Self::Summarize(_) => Operation::Summarize,
        }
    }

    /// Serialized payload: JSON for chat, plain text otherwise
    pub fn body(&self) -> Result<RequestBody> {
        Ok(match self {
            Self::Chat(request) => RequestBody::Json(serde_json::to_value(request)?),
            Self::Enhance(text) | Self::Summarize(text) => RequestBody::Text(text.clone()),
        })
    }
}
