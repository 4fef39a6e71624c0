//! Wire frames exchanged with clients.
//!
//! Client → server:
//! - join (first frame only): `{"username": "...", "topic": "..."}`
//! - chat: `{"message": "...", "timestamp": 1000}` (`timestamp` optional)
//! - the literal text `/list`
//!
//! Server → client frames are the variants of `ServerMessage`, plus the
//! plain-text topic list produced by `render_topic_list`.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::relay::ChatMessage;
use crate::utils::ProtocolError;

/// Command that asks for the active topic list.
pub const LIST_COMMAND: &str = "/list";

/// Decoded join frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub username: String,
    pub topic: String,
}

impl JoinRequest {
    /// Decode a join frame. Both fields must be present, strings, and
    /// non-empty.
    pub fn parse(frame: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(frame).map_err(|_| ProtocolError::MalformedJoin)?;
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        match (field("username"), field("topic")) {
            (Some(username), Some(topic)) => Ok(Self { username, topic }),
            _ => Err(ProtocolError::MissingJoinFields),
        }
    }
}

/// Decoded chat frame with non-empty text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    /// Client-supplied timestamp; the server clock is used when absent.
    pub timestamp: Option<i64>,
}

impl ChatRequest {
    /// Decode a chat frame. `Ok(None)` means the frame carried no text and
    /// should be ignored without a reply.
    pub fn parse(frame: &str) -> Result<Option<Self>, ProtocolError> {
        let value: Value = serde_json::from_str(frame).map_err(|_| ProtocolError::MalformedJson)?;
        let object = value.as_object().ok_or(ProtocolError::NotAnObject)?;

        let message = match object.get("message") {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(text)) if text.is_empty() => return Ok(None),
            Some(Value::String(text)) => text.clone(),
            Some(_) => {
                return Err(ProtocolError::InvalidField {
                    field: "message",
                    expected: "a string",
                });
            }
        };

        let timestamp = match object.get("timestamp") {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.as_i64().ok_or(ProtocolError::InvalidField {
                field: "timestamp",
                expected: "an integer",
            })?),
        };

        Ok(Some(Self { message, timestamp }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Delivered,
}

/// JSON frames the server sends. Untagged: each variant is told apart by
/// its field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Error {
        error: String,
    },
    System {
        system: String,
    },
    Delivered {
        status: DeliveryStatus,
        message: String,
        timestamp: i64,
    },
    Chat {
        username: String,
        message: String,
        timestamp: i64,
    },
}

impl ServerMessage {
    pub fn error(err: &ProtocolError) -> Self {
        Self::Error {
            error: err.to_string(),
        }
    }

    pub fn renamed(username: &str) -> Self {
        Self::System {
            system: format!("Your username is now '{username}' (original was taken)"),
        }
    }

    pub fn delivered(message: &ChatMessage) -> Self {
        Self::Delivered {
            status: DeliveryStatus::Delivered,
            message: message.message.clone(),
            timestamp: message.timestamp,
        }
    }
}

/// Plain-text reply to `/list`.
pub fn render_topic_list(topics: &[(String, usize)]) -> String {
    let mut out = String::from("Active Topics:\n");
    if topics.is_empty() {
        out.push_str("No active topics");
    }
    for (name, count) in topics {
        let _ = writeln!(out, "{name} ({count} users)");
    }
    out.trim_end().to_string()
}
