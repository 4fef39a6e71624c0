//! The `transport` module handles network communication with clients over
//! WebSockets.
//!
//! It defines the JSON/text frames exchanged with clients, the per-connection
//! session state machine, and the server accept loop that ties each socket to
//! a session.

pub mod message;
pub mod session;
pub mod websocket;

pub use message::{ChatRequest, JoinRequest, ServerMessage};
pub use session::{Session, SessionState, Step};
pub use websocket::{serve, start_websocket_server};

#[cfg(test)]
mod tests;
