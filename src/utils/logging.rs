//! Tracing setup shared by the relay server and the CLI client.

use std::str::FromStr;

use tracing::Level;

/// Map a configured level name onto a `tracing::Level`. Unknown names fall
/// back to `INFO`.
pub fn parse_level(name: &str) -> Level {
    match name.trim().to_lowercase().as_str() {
        "warning" => Level::WARN,
        other => Level::from_str(other).unwrap_or(Level::INFO),
    }
}

/// Install the global fmt subscriber. Later calls are ignored.
pub fn init(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(parse_level(level))
        .with_target(false)
        .try_init();
}
