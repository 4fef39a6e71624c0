use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;

use crate::relay::ExpiryScheduler;

/// Top-level configuration settings for the application.
///
/// Groups the listener address, relay behaviour and logging level.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Where the WebSocket server listens.
    pub server: ServerSettings,
    /// Relay tuning.
    pub relay: RelaySettings,
    /// Log output.
    pub log: LogSettings,
}

/// Configuration settings for the server.
///
/// Defines the host and port the WebSocket listener binds to.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Interface to bind, e.g. `127.0.0.1` or `0.0.0.0`.
    pub host: String,
    /// TCP port to bind.
    pub port: u16,
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration settings for the relay.
///
/// Controls how long broadcast messages are retained in their topic.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    /// Seconds a broadcast message stays in its topic's live list. At most
    /// `ExpiryScheduler::MAX_TTL`.
    pub message_ttl_secs: u64,
}

impl RelaySettings {
    pub fn message_ttl(&self) -> Duration {
        Duration::from_secs(self.message_ttl_secs)
    }
}

/// Configuration settings for logging.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Maximum level: `error`, `warn`, `info`, `debug` or `trace`.
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Every field is optional. Missing values are filled from
/// `Settings::default()` by `merge`.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub relay: Option<PartialRelaySettings>,
    pub log: Option<PartialLogSettings>,
}

/// Partial server settings.
#[derive(Debug, Deserialize, Default)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Partial relay settings.
#[derive(Debug, Deserialize, Default)]
pub struct PartialRelaySettings {
    pub message_ttl_secs: Option<u64>,
}

/// Partial logging settings.
#[derive(Debug, Deserialize, Default)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

/// Provides default values for `Settings`.
///
/// The relay listens on localhost:8000 and keeps messages for 30 seconds.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            relay: RelaySettings {
                message_ttl_secs: ExpiryScheduler::DEFAULT_TTL.as_secs(),
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl PartialSettings {
    /// Overlay whatever was provided on top of `defaults`, rejecting values
    /// the relay cannot honour.
    pub fn merge(self, defaults: Settings) -> Result<Settings, ConfigError> {
        let server = self.server.unwrap_or_default();
        let relay = self.relay.unwrap_or_default();
        let log = self.log.unwrap_or_default();

        let message_ttl_secs = relay
            .message_ttl_secs
            .unwrap_or(defaults.relay.message_ttl_secs);
        let max_ttl_secs = ExpiryScheduler::MAX_TTL.as_secs();
        if message_ttl_secs > max_ttl_secs {
            return Err(ConfigError::Message(format!(
                "relay.message_ttl_secs = {message_ttl_secs} exceeds the maximum of {max_ttl_secs}"
            )));
        }

        Ok(Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(defaults.server.host),
                port: server.port.unwrap_or(defaults.server.port),
            },
            relay: RelaySettings { message_ttl_secs },
            log: LogSettings {
                level: log.level.unwrap_or(defaults.log.level),
            },
        })
    }
}
