mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{LogSettings, RelaySettings, ServerSettings, Settings};

/// Prefix of the environment variables read by `load_config`, e.g.
/// `TOPICRELAY_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "TOPICRELAY";

/// Loads the configuration from `config/default.*` (if present) and
/// `TOPICRELAY_*` environment variables, merged over the defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let partial: PartialSettings = builder.build()?.try_deserialize()?;
    partial.merge(Settings::default())
}
