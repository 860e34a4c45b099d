//! Error types for the RagDesk client core.

use thiserror::Error;

/// A shared error type for the whole client core.
///
/// Every flow surfaces one of these tagged variants; callers discriminate on
/// the variant instead of inspecting response shapes at each call site.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RagDeskError {
    /// The backend answered with a non-success HTTP status.
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// The transport cannot deliver the response body incrementally.
    #[error("Streaming is not supported by this transport")]
    UnsupportedTransport,

    /// A background task did not reach a terminal status in time.
    #[error("Polling task '{task_id}' timed out after {elapsed_secs}s")]
    PollTimeout { task_id: String, elapsed_secs: u64 },

    /// Too many consecutive transient failures while polling.
    #[error("Polling task '{task_id}' failed after {attempts} consecutive errors: {message}")]
    PollNetwork {
        task_id: String,
        attempts: u32,
        message: String,
    },

    /// Persistence read/write failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Legacy record conversion failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Transport-level failure (connection refused, reset, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected user input (empty text, unsupported file type, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Another flow of the same kind is still running.
    #[error("Busy: {0}")]
    Busy(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RagDeskError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an Http error
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a Migration error
    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration(message.into())
    }

    /// Creates a Network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an InvalidInput error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a 404 HTTP error
    pub fn is_http_not_found(&self) -> bool {
        matches!(self, Self::Http { status: 404, .. })
    }

    /// Check if this error is a persistence failure (storage or migration).
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Migration(_))
    }

    /// Check if a poll loop may retry after this error.
    ///
    /// Network failures and server-side HTTP errors are transient; a 404 is
    /// handled separately as a terminal "not found".
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Http { status, .. } => *status != 404,
            _ => false,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for RagDeskError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for RagDeskError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for RagDeskError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, RagDeskError>`.
pub type Result<T> = std::result::Result<T, RagDeskError>;
