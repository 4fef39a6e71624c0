//! Broadcast engine
//!
//! `Relay` is the service every session talks to. It owns the shared
//! `TopicRegistry` and the `ExpiryScheduler`, and implements fanout:
//!
//! 1. store the message in the topic's live list and schedule its expiry
//! 2. take a member snapshot and push the frame to everyone but the sender
//! 3. after the pass, prune every member whose send failed
//!
//! A failing member never aborts the pass and is never reported to the
//! sender. Sends only enqueue on each member's channel, so fanout runs
//! without awaiting and without holding the registry lock.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::relay::expiry::ExpiryScheduler;
use crate::relay::message::ChatMessage;
use crate::relay::registry::TopicRegistry;
use crate::relay::topic::Username;

/// Outcome of one fanout pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Members the frame was queued for.
    pub delivered: usize,
    /// Members removed from the topic because their send failed.
    pub pruned: Vec<Username>,
}

/// The relay service shared by every session.
///
/// Constructed once at startup and handed out behind an `Arc`. Owns the
/// topic registry and the expiry scheduler that prunes stored messages.
#[derive(Debug)]
pub struct Relay {
    registry: Arc<TopicRegistry>,
    expiry: ExpiryScheduler,
}

impl Relay {
    /// Build a relay with an empty registry. Spawns the expiry worker, so it
    /// must run inside a Tokio runtime.
    pub fn new(message_ttl: Duration) -> Self {
        Self::with_registry(Arc::new(TopicRegistry::new()), message_ttl)
    }

    pub fn with_registry(registry: Arc<TopicRegistry>, message_ttl: Duration) -> Self {
        let expiry = ExpiryScheduler::spawn(registry.clone(), message_ttl);
        Self { registry, expiry }
    }

    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.registry
    }

    pub fn expiry(&self) -> &ExpiryScheduler {
        &self.expiry
    }

    /// Fan `message` out to every member of `topic` except `exclude`.
    ///
    /// A topic that does not exist has no one to deliver to and nothing is
    /// stored.
    pub fn broadcast(&self, topic: &str, message: ChatMessage, exclude: &str) -> BroadcastReport {
        let text = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                warn!(topic, error = %e, "failed to serialize chat message");
                return BroadcastReport::default();
            }
        };

        if !self.registry.store_message(topic, message.clone()) {
            warn!(topic, "broadcast to unknown topic dropped");
            return BroadcastReport::default();
        }
        self.expiry.schedule(topic, message);

        let frame = WsMessage::text(text);
        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();

        for (username, handle) in self.registry.snapshot_members(topic) {
            if username == exclude {
                continue;
            }
            match handle.send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(topic, username = %username, error = %e, "send failed; pruning member");
                    failed.push((username, handle.id));
                }
            }
        }

        for (username, connection_id) in failed {
            if self
                .registry
                .leave_connection(topic, &username, &connection_id)
            {
                report.pruned.push(username);
            }
        }

        if !report.pruned.is_empty() {
            info!("{}", self.registry.summary());
        }
        report
    }
}
