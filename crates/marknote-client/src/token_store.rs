//! Credential storage
//!
//! The client never reaches for ambient state: whoever builds an
//! [`ApiClient`](crate::ApiClient) hands it a [`TokenStore`].

use marknote_core::{Error, JwtResponse, Result, User};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Tokens and profile of the signed-in user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub user: Option<User>,
}

impl From<&JwtResponse> for Credentials {
    fn from(jwt: &JwtResponse) -> Self {
        Self {
            access_token: Some(jwt.access_token.clone()),
            refresh_token: jwt.refresh_token.clone(),
            user: jwt.user(),
        }
    }
}

/// Source of the bearer token attached to backend requests
pub trait TokenStore: Send + Sync {
    /// Current access token
    fn access_token(&self) -> Option<String>;

    /// Token used to obtain a new access token
    fn refresh_token(&self) -> Option<String>;

    /// Profile of the signed-in user
    fn user(&self) -> Option<User>;

    /// Replace all stored credentials
    fn store(&self, credentials: Credentials) -> Result<()>;

    /// Replace only the access token
    fn set_access_token(&self, token: String) -> Result<()>;

    /// Forget everything
    fn clear(&self) -> Result<()>;

    /// Whether an access token is present
    fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }
}

/// In-memory token store
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    credentials: RwLock<Credentials>,
}

impl MemoryTokenStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding an access token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            credentials: RwLock::new(Credentials {
                access_token: Some(token.into()),
                ..Default::default()
            }),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<String> {
        self.credentials.read().access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.credentials.read().refresh_token.clone()
    }

    fn user(&self) -> Option<User> {
        self.credentials.read().user.clone()
    }

    fn store(&self, credentials: Credentials) -> Result<()> {
        *self.credentials.write() = credentials;
        Ok(())
    }

    fn set_access_token(&self, token: String) -> Result<()> {
        self.credentials.write().access_token = Some(token);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.credentials.write() = Credentials::default();
        Ok(())
    }
}

/// Token store persisted as a JSON file
///
/// Every change is written through, so credentials survive restarts.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    credentials: RwLock<Credentials>,
}

impl FileTokenStore {
    /// Open the store at `path`, loading whatever is there
    ///
    /// A missing file yields an empty store. An unreadable one is logged
    /// and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let credentials = Self::load(&path);
        Self {
            path,
            credentials: RwLock::new(credentials),
        }
    }

    /// Default location under the user's config directory
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("marknote").join("credentials.json"))
            .ok_or_else(|| Error::config("could not determine the user config directory"))
    }

    /// Path backing this store
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Credentials {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Credentials::default(),
            Err(e) => {
                warn!("Failed to read credentials from {:?}: {}", path, e);
                return Credentials::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!("Failed to parse credentials in {:?}: {}", path, e);
                Credentials::default()
            }
        }
    }

    fn persist(&self, credentials: &Credentials) -> Result<()> {
        if credentials == &Credentials::default() {
            match std::fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            debug!("Removed credentials file {:?}", self.path);
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(credentials)?;
        std::fs::write(&self.path, json)?;
        debug!("Saved credentials to {:?}", self.path);
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> Option<String> {
        self.credentials.read().access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.credentials.read().refresh_token.clone()
    }

    fn user(&self) -> Option<User> {
        self.credentials.read().user.clone()
    }

    fn store(&self, credentials: Credentials) -> Result<()> {
        let mut guard = self.credentials.write();
        self.persist(&credentials)?;
        *guard = credentials;
        Ok(())
    }

    fn set_access_token(&self, token: String) -> Result<()> {
        let mut guard = self.credentials.write();
        let mut updated = guard.clone();
        updated.access_token = Some(token);
        self.persist(&updated)?;
        *guard = updated;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self.credentials.write();
        let cleared = Credentials::default();
        self.persist(&cleared)?;
        *guard = cleared;
        Ok(())
    }
}

/// Shorten a token for log output
pub(crate) fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{}...", prefix)
}
