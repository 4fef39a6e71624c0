//! Message expiry
//!
//! Every broadcast message is kept in its topic's live list for a fixed
//! time-to-live (30 seconds by default) and then removed, whether or not it
//! was delivered to anyone.
//!
//! Pending expiries live in a single `DelayQueue` owned by one worker task.
//! `schedule` only enqueues a request on a channel, so the broadcast path
//! never waits on it. The scheduler keeps the worker's `JoinHandle` and
//! aborts it when dropped.
//!
//! If the topic was deleted before its message expires, the registry simply
//! no longer has the message and the removal is a no-op.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::time::DelayQueue;
use tracing::{debug, warn};

use crate::relay::message::ChatMessage;
use crate::relay::registry::TopicRegistry;

#[derive(Debug)]
struct PendingExpiry {
    topic: String,
    message: ChatMessage,
    ttl: Duration,
}

/// Owner of the delayed-removal queue for broadcast messages.
///
/// Cheap to call from the broadcast path: `schedule` only sends on a channel.
/// The worker holding the queue runs until the scheduler is dropped.
#[derive(Debug)]
pub struct ExpiryScheduler {
    ttl: Duration,
    requests: UnboundedSender<PendingExpiry>,
    worker: JoinHandle<()>,
}

impl ExpiryScheduler {
    /// Retention window applied when no other TTL is configured.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

    /// Longest TTL the queue accepts. `DelayQueue` panics on timeouts beyond
    /// roughly two years, so anything longer is clamped to this.
    pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

    /// Start the expiry worker. Must be called from within a Tokio runtime.
    pub fn spawn(registry: Arc<TopicRegistry>, ttl: Duration) -> Self {
        let (requests, incoming) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_expiry_loop(registry, incoming));
        Self {
            ttl: clamp_ttl(ttl),
            requests,
            worker,
        }
    }

    /// Remove `message` from `topic` once the configured TTL has elapsed.
    pub fn schedule(&self, topic: &str, message: ChatMessage) {
        self.schedule_after(topic, message, self.ttl);
    }

    pub fn schedule_after(&self, topic: &str, message: ChatMessage, ttl: Duration) {
        let request = PendingExpiry {
            topic: topic.to_string(),
            message,
            ttl: clamp_ttl(ttl),
        };
        if self.requests.send(request).is_err() {
            warn!(topic, "expiry worker is not running; message will not expire");
        }
    }
}

fn clamp_ttl(ttl: Duration) -> Duration {
    if ttl > ExpiryScheduler::MAX_TTL {
        warn!(
            requested_secs = ttl.as_secs(),
            max_secs = ExpiryScheduler::MAX_TTL.as_secs(),
            "message TTL clamped"
        );
        return ExpiryScheduler::MAX_TTL;
    }
    ttl
}

impl Drop for ExpiryScheduler {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run_expiry_loop(
    registry: Arc<TopicRegistry>,
    mut incoming: UnboundedReceiver<PendingExpiry>,
) {
    let mut queue: DelayQueue<PendingExpiry> = DelayQueue::new();

    loop {
        tokio::select! {
            request = incoming.recv() => match request {
                Some(pending) => {
                    let ttl = pending.ttl;
                    queue.insert(pending, ttl);
                }
                None => break,
            },
            Some(expired) = queue.next(), if !queue.is_empty() => {
                let PendingExpiry { topic, message, .. } = expired.into_inner();
                if registry.remove_message(&topic, &message) {
                    debug!(topic = %topic, username = %message.username, "message expired");
                }
            }
        }
    }

    debug!(pending = queue.len(), "expiry worker stopped");
}
