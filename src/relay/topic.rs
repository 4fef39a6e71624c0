//! Topic state
//!
//! A `Topic` holds the members of one chat room, keyed by their display
//! username, and the messages broadcast in it that have not expired yet.
//!
//! Concurrency note: a `Topic` is only ever touched through the
//! `TopicRegistry` lock.

use std::collections::BTreeMap;

use crate::connection::ConnectionHandle;
use crate::relay::message::ChatMessage;

pub type Username = String;

/// One chat room.
///
/// Display names are unique within a topic; the registry guarantees it by
/// resolving collisions before `add_member`.
#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    /// Members keyed by display name.
    pub members: BTreeMap<Username, ConnectionHandle>,
    /// Unexpired messages, oldest first.
    pub messages: Vec<ChatMessage>,
}

impl Topic {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: BTreeMap::new(),
            messages: Vec::new(),
        }
    }

    pub fn has_member(&self, username: &str) -> bool {
        self.members.contains_key(username)
    }

    /// Insert a member under a name the caller has already made unique.
    pub fn add_member(&mut self, username: Username, handle: ConnectionHandle) {
        debug_assert!(!self.members.contains_key(&username));
        self.members.insert(username, handle);
    }

    pub fn remove_member(&mut self, username: &str) -> Option<ConnectionHandle> {
        self.members.remove(username)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Remove the first stored copy equal to `message`. Returns `false` if
    /// there was none.
    pub fn remove_message(&mut self, message: &ChatMessage) -> bool {
        match self.messages.iter().position(|m| m == message) {
            Some(index) => {
                self.messages.remove(index);
                true
            }
            None => false,
        }
    }
}
