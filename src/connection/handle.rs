use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::utils::SendError;

/// Sending half of one client's duplex WebSocket channel.
///
/// Frames are queued on an unbounded channel and written to the socket by a
/// dedicated writer task. Once that task exits (socket closed or broken) the
/// receiver is dropped and every further `send_*` fails, which is how the
/// broadcast engine detects dead members.
///
/// Cloning is cheap: clones share the same underlying channel and `id`.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Unique identifier for the connection, used in logs and to tell two
    /// successive members with the same display name apart.
    pub id: String,

    sender: UnboundedSender<WsMessage>,
}

impl ConnectionHandle {
    /// Wrap an existing sender. The `id` is a fresh UUID.
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
        }
    }

    /// Create a handle together with the receiving end the writer task drains.
    pub fn channel() -> (Self, UnboundedReceiver<WsMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn send(&self, frame: WsMessage) -> Result<(), SendError> {
        self.sender
            .send(frame)
            .map_err(|_| SendError::ConnectionClosed(self.id.clone()))
    }

    /// Queue a plain text frame.
    pub fn send_text(&self, text: impl Into<String>) -> Result<(), SendError> {
        self.send(WsMessage::text(text.into()))
    }

    /// Serialize `payload` as JSON and queue it as a text frame.
    pub fn send_json<T: Serialize>(&self, payload: &T) -> Result<(), SendError> {
        let text = serde_json::to_string(payload).map_err(|e| SendError::Encode(e.to_string()))?;
        self.send_text(text)
    }

    /// `true` once the writer side has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
