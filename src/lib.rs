//! # topicrelay
//!
//! `topicrelay` is a topic-based, in-memory chat relay. Clients connect over
//! WebSockets, join a named topic and every message they send is fanned out
//! to the other members of that topic.
//!
//! ## Core Modules
//!
//! - `relay`: the topic registry, username resolution, broadcast fanout and
//!   message expiry.
//! - `connection`: the handle the relay uses to push frames to one client.
//! - `transport`: the wire protocol, the per-connection session and the
//!   WebSocket server.
//! - `client`: the reference command-line chat client.
//! - `config`: loading server configuration.
//! - `utils`: error types and logging setup.

pub mod client;
pub mod config;
pub mod connection;
pub mod relay;
pub mod transport;
pub mod utils;
