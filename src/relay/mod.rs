//! The relay core: topic registry, username resolution, broadcast fanout and
//! message expiry.

pub mod engine;
pub mod expiry;
pub mod message;
pub mod registry;
pub mod topic;
pub mod username;

pub use engine::{BroadcastReport, Relay};
pub use expiry::ExpiryScheduler;
pub use message::ChatMessage;
pub use registry::{RegistrySummary, TopicRegistry};
