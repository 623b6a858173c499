//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//! Configuration is loaded from a TOML file; private keys come from the
//! environment variables the file names.
//!
//! # Example
//!
//! ```no_run
//! use racetrack::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use super::bots::BotConfig;
use super::chain::ChainConfig;
use super::logging::LoggingConfig;
use super::race::RaceConfig;
use super::rates::RatesConfig;
use super::storage::StorageConfig;
use crate::error::{ConfigError, Result};

/// Main application configuration.
///
/// Every section is optional; an empty file yields an in-memory, dry-run
/// engine with default race settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub race: RaceConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub chain: ChainConfig,

    #[serde(default)]
    pub rates: RatesConfig,

    /// Reserved bot accounts used to backfill tracks.
    #[serde(default)]
    pub bots: Vec<BotConfig>,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.chain.load_secrets();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the content is
    /// malformed, or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Check cross-field constraints. Called by [`parse_toml`](Self::parse_toml).
    ///
    /// # Errors
    ///
    /// The first invalid or missing field found.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        self.race.validate()?;
        self.chain.validate()?;

        if let StorageConfig::Sqlite { path } = &self.storage {
            if path.trim().is_empty() {
                return Err(ConfigError::MissingField { field: "path" }.into());
            }
        }

        if self.rates.enabled {
            if self.rates.poll_interval_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "poll_interval_secs",
                    reason: "must be greater than 0".to_string(),
                }
                .into());
            }
            url::Url::parse(&self.rates.source_url).map_err(|e| ConfigError::InvalidValue {
                field: "source_url",
                reason: e.to_string(),
            })?;
        }
        if self.rates.ttl_secs <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "ttl_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        let mut ids = HashSet::new();
        for bot in &self.bots {
            if !ids.insert(bot.id.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "bots",
                    reason: format!("duplicate bot id '{}'", bot.id),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::infrastructure::config::chain::ChainMode;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.storage, StorageConfig::Memory);
        assert_eq!(config.chain.mode, ChainMode::DryRun);
        assert_eq!(config.race.duration_secs, 300);
        assert!(config.bots.is_empty());
    }

    #[test]
    fn sqlite_storage_and_bots_parse() {
        let config = Config::parse_toml(
            r#"
[storage]
backend = "sqlite"
path = "race.db"

[[bots]]
id = "bot1"
name = "Bot One"
address = "0xB0B"
"#,
        )
        .unwrap();
        assert_eq!(
            config.storage,
            StorageConfig::Sqlite {
                path: "race.db".into()
            }
        );
        assert!(config.bots[0].to_user().is_bot);
    }

    #[test]
    fn duplicate_bot_ids_are_rejected() {
        let result = Config::parse_toml(
            r#"
[[bots]]
id = "b"
name = "a"
address = "0x1"

[[bots]]
id = "b"
name = "c"
address = "0x2"
"#,
        );
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidValue { field: "bots", .. }))
        ));
    }

    #[test]
    fn evm_mode_requires_contract() {
        let result = Config::parse_toml(
            r#"
[chain]
mode = "evm"
contract_address = ""
"#,
        );
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::MissingField {
                field: "contract_address"
            }))
        ));
    }
}
