//! The `error` module defines the error types used within `topicrelay`.
//!
//! - `ProtocolError`: a frame from a client could not be understood. The
//!   `Display` text is exactly what the client receives in its `{"error": ...}`
//!   payload.
//! - `SendError`: pushing a frame to a connection failed because its writer
//!   has gone away.
//! - `RelayError`: process-level failures (binding, handshakes, config).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The join frame was not valid JSON.
    #[error("Invalid JSON format")]
    MalformedJoin,

    /// The join frame lacked a non-empty `username` or `topic` string.
    #[error("Need username and topic!")]
    MissingJoinFields,

    /// A chat frame was not valid JSON.
    #[error("Invalid JSON")]
    MalformedJson,

    #[error("Expected a JSON object")]
    NotAnObject,

    #[error("Field '{field}' must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("connection {0} is closed")]
    ConnectionClosed(String),

    #[error("failed to encode frame: {0}")]
    Encode(String),
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
