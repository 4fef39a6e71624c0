//! Topic registry
//!
//! The registry owns every live `Topic`: its members and its unexpired
//! messages. It is constructed once by the server and shared behind an `Arc`
//! with every session task, the broadcast engine and the expiry scheduler.
//!
//! All state sits behind a single `Mutex`. Every public method takes the
//! lock, does a small amount of in-memory work and releases it; nothing here
//! awaits or touches the network, so the lock is never held across I/O. This
//! serialization is what makes these guarantees hold:
//!
//! - `join` resolves the display name and inserts the member in one critical
//!   section, so two concurrent joins can never claim the same name.
//! - A topic is deleted in the same critical section that removes its last
//!   member, so no reader ever observes an empty topic.
//! - `snapshot_members` hands out a copy; fanout iterates that copy while
//!   joins and leaves carry on.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::connection::ConnectionHandle;
use crate::relay::message::ChatMessage;
use crate::relay::topic::{Topic, Username};
use crate::relay::username;

/// Every live topic, keyed and ordered by name.
///
/// A topic is present exactly while it has at least one member.
#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: Mutex<BTreeMap<String, Topic>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn topics(&self) -> MutexGuard<'_, BTreeMap<String, Topic>> {
        // Nothing under the lock can leave a half-applied mutation behind, so
        // a poisoned map is still consistent.
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit `handle` to `topic` under a collision-free version of
    /// `desired_username`, creating the topic if needed. Returns the name the
    /// member was actually registered under.
    pub fn join(&self, topic: &str, desired_username: &str, handle: ConnectionHandle) -> Username {
        let mut topics = self.topics();
        let entry = topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(topic));

        let actual = username::resolve(desired_username, |name| entry.has_member(name));
        debug!(topic, username = %actual, connection = %handle.id, "member joined");
        entry.add_member(actual.clone(), handle);
        actual
    }

    /// Whether `username` in `topic` is still held by `connection_id`.
    /// `false` once the member was pruned, even if the name was reused.
    pub fn is_member(&self, topic: &str, username: &str, connection_id: &str) -> bool {
        self.topics()
            .get(topic)
            .and_then(|t| t.members.get(username))
            .is_some_and(|handle| handle.id == connection_id)
    }

    /// Remove `username` from `topic`. Absent members are a no-op. When the
    /// last member leaves, the topic and its stored messages are discarded.
    pub fn leave(&self, topic: &str, username: &str) -> bool {
        self.remove_member_if(topic, username, |_| true)
    }

    /// Like `leave`, but only if the member under `username` is still the
    /// connection identified by `connection_id`. A pruned member's name may
    /// already belong to someone else by the time its session cleans up.
    pub fn leave_connection(&self, topic: &str, username: &str, connection_id: &str) -> bool {
        self.remove_member_if(topic, username, |handle| handle.id == connection_id)
    }

    fn remove_member_if<F>(&self, topic: &str, username: &str, matches: F) -> bool
    where
        F: Fn(&ConnectionHandle) -> bool,
    {
        let mut topics = self.topics();
        let Some(t) = topics.get_mut(topic) else {
            return false;
        };

        match t.members.get(username) {
            Some(handle) if matches(handle) => {}
            _ => return false,
        }
        t.remove_member(username);
        debug!(topic, username, "member left");

        if t.is_empty() {
            topics.remove(topic);
            debug!(topic, "topic emptied and removed");
        }
        true
    }

    /// Point-in-time copy of the members of `topic`, ordered by username.
    /// Empty if the topic does not exist.
    pub fn snapshot_members(&self, topic: &str) -> Vec<(Username, ConnectionHandle)> {
        self.topics()
            .get(topic)
            .map(|t| {
                t.members
                    .iter()
                    .map(|(name, handle)| (name.clone(), handle.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every live topic with its member count, ordered by topic name.
    pub fn list_topics(&self) -> Vec<(String, usize)> {
        self.topics()
            .values()
            .map(|t| (t.name.clone(), t.members.len()))
            .collect()
    }

    /// Append `message` to the live list of `topic`. Returns `false` (and
    /// stores nothing) if the topic does not exist.
    pub fn store_message(&self, topic: &str, message: ChatMessage) -> bool {
        match self.topics().get_mut(topic) {
            Some(t) => {
                t.push_message(message);
                true
            }
            None => false,
        }
    }

    /// Remove one stored copy of `message` from `topic`. Returns `false` if
    /// the topic is gone or the message already was removed.
    pub fn remove_message(&self, topic: &str, message: &ChatMessage) -> bool {
        self.topics()
            .get_mut(topic)
            .is_some_and(|t| t.remove_message(message))
    }

    /// Copy of the live messages in `topic`, oldest first.
    pub fn messages(&self, topic: &str) -> Vec<ChatMessage> {
        self.topics()
            .get(topic)
            .map(|t| t.messages.clone())
            .unwrap_or_default()
    }

    pub fn member_count(&self, topic: &str) -> usize {
        self.topics().get(topic).map_or(0, |t| t.members.len())
    }

    pub fn contains_topic(&self, topic: &str) -> bool {
        self.topics().contains_key(topic)
    }

    pub fn summary(&self) -> RegistrySummary {
        RegistrySummary {
            topics: self.list_topics(),
        }
    }
}

/// Snapshot of registry occupancy, logged whenever membership changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySummary {
    pub topics: Vec<(String, usize)>,
}

impl RegistrySummary {
    pub fn total_users(&self) -> usize {
        self.topics.iter().map(|(_, count)| count).sum()
    }
}

impl fmt::Display for RegistrySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Active users: {} | Active topics: {} | Topics: ",
            self.total_users(),
            self.topics.len()
        )?;
        if self.topics.is_empty() {
            return f.write_str("No active topics");
        }
        let listed: Vec<String> = self
            .topics
            .iter()
            .map(|(name, count)| format!("{name}({count})"))
            .collect();
        f.write_str(&listed.join(", "))
    }
}
