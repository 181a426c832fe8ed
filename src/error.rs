//! Error types for the chat-link client library.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChatLinkError>;

/// Errors surfaced by the chat-link client.
#[derive(Debug, Error)]
pub enum ChatLinkError {
    /// Invalid client configuration (bad base URL, missing settings).
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The server answered an HTTP request with a non-2xx status.
    ///
    /// `message` is the server-provided `message` field when the error body
    /// could be parsed, otherwise a generic fallback.
    #[error("Server error ({status_code}): {message}")]
    ServerError { status_code: u16, message: String },

    /// Authentication failed (login rejected, invalid token).
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// WebSocket transport failure (connect, handshake, mid-session).
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// An operation exceeded its configured timeout.
    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// A payload could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The durable token store could not be read or written.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// HTTP transport failure below the status-code level.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl From<serde_json::Error> for ChatLinkError {
    fn from(e: serde_json::Error) -> Self {
        ChatLinkError::SerializationError(e.to_string())
    }
}
