//! Shared utilities: the error taxonomy and logging setup.

pub mod error;
pub mod logging;

pub use error::{ProtocolError, RelayError, SendError};
