//! Error types for the pickleball remote client.

use thiserror::Error;

/// Errors that can occur when using the remote client.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Failed to send a frame through the push-channel transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a frame from the push-channel transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The push-channel transport was closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a wire message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An HTTP request to the session API failed before a JSON body was read.
    #[error("http request failed: {0}")]
    Http(String),

    /// The session API answered without `success: true`.
    #[error("server rejected request: {message}")]
    Api {
        /// Server-provided message, or a generic fallback.
        message: String,
    },

    /// The push channel is not open.
    #[error("push channel not connected")]
    NotConnected,

    /// The operation requires a joined session.
    #[error("no session joined")]
    NotJoined,

    /// The session identifier was empty after trimming.
    #[error("session id must not be empty")]
    EmptySessionId,

    /// A side name other than `A` or `B`.
    #[error("unknown side: {0:?}")]
    UnknownSide(String),

    /// A configured or derived URL could not be built.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for remote client operations.
pub type Result<T> = std::result::Result<T, RemoteError>;
