//! Error types for Marknote

/// Result type alias using Marknote's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Marknote operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level failure, already classified
    #[error(transparent)]
    Transport(#[from] TransportFault),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The transport fault behind this error, if any
    pub fn as_fault(&self) -> Option<&TransportFault> {
        match self {
            Self::Transport(fault) => Some(fault),
            _ => None,
        }
    }
}

/// Classification of a failed exchange with the backend
///
/// Produced by the transport layer so callers can branch on the category
/// instead of inspecting error messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportFault {
    /// HTTP 404: the endpoint does not exist
    #[error("endpoint not found")]
    NotFound,

    /// HTTP 401
    #[error("unauthorized")]
    Unauthorized,

    /// HTTP 403
    #[error("forbidden")]
    Forbidden,

    /// Any other non-success status
    #[error("request failed: {0}")]
    Status(u16),

    /// A 2xx response whose envelope carried a business error code
    #[error("{message}")]
    Rejected { code: i64, message: String },

    /// The response body could not be decoded
    #[error("invalid response body: {0}")]
    Decode(String),

    /// Connection-level failure (DNS, refused, reset, broken body)
    #[error("{0}")]
    Connection(String),

    /// The request exceeded its deadline
    #[error("request timed out")]
    Timeout,
}

impl TransportFault {
    /// Classify a non-success HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => Self::NotFound,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            other => Self::Status(other),
        }
    }

    /// Whether this fault means the endpoint is not deployed
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
