//! Per-connection session lifecycle
//!
//! `Connecting → Joining → Active → Closed`
//!
//! - The first text frame must be a join frame. If it cannot be decoded the
//!   client gets an error frame and the session closes without ever joining.
//! - While `Active`, every text frame is either `/list` or a chat frame. A bad
//!   chat frame is answered with an error frame and the session carries on.
//! - However the session ends, the member is removed from its topic once.
//!
//! Each receive-and-process step yields a `Step`, and `run` alone decides
//! whether to continue or close.

use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tracing::{debug, info};
use tungstenite::protocol::Message as WsMessage;

use crate::connection::ConnectionHandle;
use crate::relay::{ChatMessage, Relay};
use crate::transport::message::{
    ChatRequest, JoinRequest, LIST_COMMAND, ServerMessage, render_topic_list,
};
use crate::utils::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport handshake still in progress.
    Connecting,
    /// Waiting for the join frame.
    Joining,
    Active,
    Closed,
}

/// Result of one receive-and-process step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Ok,
    ProtocolError(ProtocolError),
    Disconnected,
}

#[derive(Debug, Clone)]
struct Membership {
    topic: String,
    username: String,
}

/// One client's lifecycle on the relay.
///
/// Owns the client's `ConnectionHandle` and, once joined, the topic and
/// display name it was admitted under.
pub struct Session {
    relay: Arc<Relay>,
    handle: ConnectionHandle,
    state: SessionState,
    membership: Option<Membership>,
}

impl Session {
    pub fn new(relay: Arc<Relay>, handle: ConnectionHandle) -> Self {
        Self {
            relay,
            handle,
            state: SessionState::Connecting,
            membership: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn connection_id(&self) -> &str {
        &self.handle.id
    }

    pub fn topic(&self) -> Option<&str> {
        self.membership.as_ref().map(|m| m.topic.as_str())
    }

    pub fn username(&self) -> Option<&str> {
        self.membership.as_ref().map(|m| m.username.as_str())
    }

    pub fn handshake_complete(&mut self) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::Joining;
        }
    }

    /// Drive the session until the client goes away or the join fails, then
    /// clean up.
    pub async fn run<S>(mut self, mut incoming: S)
    where
        S: Stream<Item = Result<WsMessage, tungstenite::Error>> + Unpin,
    {
        self.handshake_complete();

        loop {
            match self.step(&mut incoming).await {
                Step::Ok => {}
                Step::ProtocolError(err) => {
                    debug!(connection = %self.handle.id, error = %err, "protocol error");
                    self.reply(&ServerMessage::error(&err));
                    if self.state != SessionState::Active {
                        break;
                    }
                }
                Step::Disconnected => break,
            }
        }

        self.close();
    }

    /// Receive one frame and process it according to the current state.
    pub async fn step<S>(&mut self, incoming: &mut S) -> Step
    where
        S: Stream<Item = Result<WsMessage, tungstenite::Error>> + Unpin,
    {
        let text = match incoming.next().await {
            Some(Ok(WsMessage::Text(text))) => text,
            Some(Ok(WsMessage::Close(_))) | None => return Step::Disconnected,
            Some(Err(e)) => {
                debug!(connection = %self.handle.id, error = %e, "transport error");
                return Step::Disconnected;
            }
            Some(Ok(_)) => return Step::Ok,
        };

        let result = match self.state {
            SessionState::Joining => self.handle_join(text.as_str()),
            SessionState::Active if !self.still_registered() => {
                debug!(connection = %self.handle.id, "member was pruned; ending session");
                return Step::Disconnected;
            }
            SessionState::Active => self.handle_frame(text.as_str()),
            SessionState::Connecting | SessionState::Closed => return Step::Disconnected,
        };

        match result {
            Ok(()) => Step::Ok,
            Err(err) => Step::ProtocolError(err),
        }
    }

    /// A member pruned after a failed send must not keep speaking under a
    /// name that may now belong to someone else.
    fn still_registered(&self) -> bool {
        self.membership.as_ref().is_some_and(|m| {
            self.relay
                .registry()
                .is_member(&m.topic, &m.username, &self.handle.id)
        })
    }

    fn handle_join(&mut self, frame: &str) -> Result<(), ProtocolError> {
        let request = JoinRequest::parse(frame)?;
        let registry = self.relay.registry();
        let username = registry.join(&request.topic, &request.username, self.handle.clone());

        info!(
            connection = %self.handle.id,
            topic = %request.topic,
            username = %username,
            "client joined"
        );
        info!("{}", registry.summary());

        if username != request.username {
            self.reply(&ServerMessage::renamed(&username));
        }

        self.membership = Some(Membership {
            topic: request.topic,
            username,
        });
        self.state = SessionState::Active;
        Ok(())
    }

    fn handle_frame(&mut self, frame: &str) -> Result<(), ProtocolError> {
        let Some(member) = self.membership.clone() else {
            return Ok(());
        };

        if frame.trim() == LIST_COMMAND {
            let listing = render_topic_list(&self.relay.registry().list_topics());
            if let Err(e) = self.handle.send_text(listing) {
                debug!(connection = %self.handle.id, error = %e, "topic list not sent");
            }
            return Ok(());
        }

        let Some(request) = ChatRequest::parse(frame)? else {
            return Ok(());
        };

        let timestamp = request
            .timestamp
            .unwrap_or_else(|| chrono::Utc::now().timestamp());
        let message = ChatMessage::new(member.username.as_str(), request.message, timestamp);

        let report = self
            .relay
            .broadcast(&member.topic, message.clone(), &member.username);
        debug!(
            topic = %member.topic,
            username = %member.username,
            delivered = report.delivered,
            "message broadcast"
        );

        self.reply(&ServerMessage::delivered(&message));
        Ok(())
    }

    fn reply(&self, payload: &ServerMessage) {
        if let Err(e) = self.handle.send_json(payload) {
            debug!(connection = %self.handle.id, error = %e, "reply not sent");
        }
    }

    /// Remove the member from its topic. Safe to call more than once; only
    /// the first call touches the registry.
    pub fn close(&mut self) {
        if let Some(member) = self.membership.take() {
            let registry = self.relay.registry();
            if registry.leave_connection(&member.topic, &member.username, &self.handle.id) {
                info!(
                    connection = %self.handle.id,
                    topic = %member.topic,
                    username = %member.username,
                    "client left"
                );
                info!("{}", registry.summary());
            }
        }
        self.state = SessionState::Closed;
    }
}
