//! Chat message value type.
//!
//! A `ChatMessage` is stored in its topic's live message list until it
//! expires, and its JSON form is exactly the broadcast frame members receive:
//!
//! ```json
//! {"username": "alice", "message": "hi", "timestamp": 1000}
//! ```
//!
//! It holds no reference to the sender's connection. Two messages are the
//! same message when sender, text and timestamp are all equal; expiry relies
//! on that to find its copy again.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Display name of the sender within its topic.
    pub username: String,
    /// Message text.
    pub message: String,
    /// Seconds since the UNIX epoch.
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn new(username: impl Into<String>, message: impl Into<String>, timestamp: i64) -> Self {
        Self {
            username: username.into(),
            message: message.into(),
            timestamp,
        }
    }
}
