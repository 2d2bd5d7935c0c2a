//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for talking to the notes backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL every request path is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for non-streaming requests, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause between characters when replaying a fallback response
    #[serde(default = "default_char_delay_ms")]
    pub fallback_char_delay_ms: u64,

    /// Custom User-Agent header
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl ClientConfig {
    /// Non-streaming request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Fallback replay delay
    pub fn char_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_char_delay_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            fallback_char_delay_ms: default_char_delay_ms(),
            user_agent: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_char_delay_ms() -> u64 {
    20
}
