//! Error types for pushrelay

use thiserror::Error;

/// Result type alias using pushrelay's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pushrelay
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing input field
    #[error("Error decoding field: {field}")]
    Decode {
        /// Name of the missing or mistyped field
        field: String,
    },

    /// Registration token absent from the registry
    #[error("Client not found: {0}")]
    NotFound(String),

    /// Push transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Unrecognized outbound protocol
    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a decode error for the named field
    pub fn decode(field: impl Into<String>) -> Self {
        Error::Decode {
            field: field.into(),
        }
    }

    /// Check if error is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Decode { .. } | Error::NotFound(_) | Error::UnsupportedProtocol(_)
        )
    }

    /// Check if the error came from a push transport
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Http(_) | Error::Timeout(_))
    }
}
