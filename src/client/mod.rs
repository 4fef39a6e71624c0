//! The `client` module is the reference chat client that talks to the relay
//! over WebSockets. It is what `topicrelay client` runs.

pub mod chat_client;
pub use chat_client::{run_client, render_frame};
