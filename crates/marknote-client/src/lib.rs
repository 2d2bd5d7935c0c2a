//! Marknote Client
//!
//! Async client for the Marknote notes backend.
//!
//! The AI calls stream their answer through a [`ResponseSink`]:
//!
//! ```text
//! AiClient::stream ─▶ StreamSession ─▶ LineBuffer ─▶ FrameParser ─▶ sink
//!                          │
//!                          └─ 404 ─▶ FallbackSimulator ─▶ per-char replay ─▶ sink
//! ```
//!
//! Whichever path runs, the sink receives its messages in order followed
//! by exactly one `on_complete` or `on_error`.

pub mod ai;
pub mod api;
pub mod auth;
pub mod config;
pub mod delivery;
pub mod fallback;
pub mod notes;
pub mod operation;
pub mod session;
pub mod token_store;
pub mod transport;

#[cfg(test)]
mod testing;

pub use ai::AiClient;
pub use api::ApiClient;
pub use auth::AuthApi;
pub use config::ClientConfig;
pub use delivery::{Callbacks, Delivery, ResponseSink, StreamEvent};
pub use fallback::{extract_text, Extractor, FallbackSimulator};
pub use notes::{NoteQuery, NotesApi};
pub use operation::{AiTask, Operation};
pub use session::{SessionOutcome, StreamSession};
pub use token_store::{Credentials, FileTokenStore, MemoryTokenStore, TokenStore};
pub use transport::{HttpTransport, Transport};

use marknote_core::Result;
use std::sync::Arc;

/// Entry point bundling every endpoint group over one connection pool
#[derive(Debug, Clone)]
pub struct MarknoteClient {
    api: ApiClient,
    config: ClientConfig,
}

impl MarknoteClient {
    /// Build an HTTP client from configuration
    pub fn from_config(config: ClientConfig, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self {
            api: ApiClient::new(Arc::new(transport), tokens),
            config,
        })
    }

    /// Build a client over any transport
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            api: ApiClient::new(transport, tokens),
            config,
        }
    }

    pub fn ai(&self) -> AiClient {
        AiClient::new(self.api.clone()).with_char_delay(self.config.char_delay())
    }

    pub fn notes(&self) -> NotesApi {
        NotesApi::new(self.api.clone())
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.api.clone())
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        self.api.tokens()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
