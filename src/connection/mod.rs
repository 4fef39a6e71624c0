//! The `connection` module defines the server-side handle to one connected
//! client.
//!
//! A `ConnectionHandle` is the only thing the relay core knows about a
//! client's socket: it can push text frames into it and observe whether the
//! socket's writer is still alive.

pub mod handle;
pub use handle::ConnectionHandle;
