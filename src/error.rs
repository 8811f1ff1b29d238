//! Error types for the Taboo client.

use thiserror::Error;

/// Errors that can occur when using the Taboo client.
///
/// None of these are fatal to the engine: transport failures trigger a
/// reconnect and codec failures drop the offending frame.
#[derive(Debug, Error)]
pub enum TabooError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An inbound frame had no string `type` discriminant.
    #[error("frame is missing the `type` discriminant")]
    MissingMessageType,

    /// An inbound frame named a message kind outside the protocol vocabulary.
    #[error("unknown message type `{0}`")]
    UnknownMessageType(String),

    /// The client handle was used after the engine task stopped.
    #[error("client engine is not running")]
    NotConnected,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for Taboo client operations.
pub type Result<T> = std::result::Result<T, TabooError>;
