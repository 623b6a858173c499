//! Handler for the `config` command group.

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::infrastructure::config::storage::StorageConfig;
use crate::infrastructure::config::Config;

/// Default config template with documentation.
const CONFIG_TEMPLATE: &str = include_str!("../../config.toml.example");

fn section(title: &str) {
    println!();
    println!("{title}");
    println!("{}", "─".repeat(title.len().max(24)));
}

fn field(label: &str, value: impl std::fmt::Display) {
    println!("{label:<22} {value}");
}

/// Execute `config init`.
pub fn execute_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(ConfigError::InvalidValue {
            field: "config",
            reason: "file already exists (use --force to overwrite)".to_string(),
        }
        .into());
    }
    fs::write(path, CONFIG_TEMPLATE)?;
    println!("Wrote {}", path.display());
    println!("Validate it with: racetrack config validate -c {}", path.display());
    Ok(())
}

/// Execute `config show`.
pub fn execute_show(path: &Path) -> Result<()> {
    let config = Config::load(path)?;

    section("Race");
    field("Duration (s)", config.race.duration_secs);
    field("Fill wait (s)", config.race.fill_wait_secs);
    field("Update interval (s)", config.race.update_interval_secs);
    field("Finalize grace (s)", config.race.finalize_grace_secs);
    field("Prize", config.race.prize);
    field("Default bet", config.race.default_bet);
    field("Seat counts", format!("{:?}", config.race.seat_counts));

    section("Storage");
    match &config.storage {
        StorageConfig::Memory => field("Backend", "memory"),
        StorageConfig::Sqlite { path } => {
            field("Backend", "sqlite");
            field("Path", path);
        }
    }

    section("Rates");
    field("Poller", if config.rates.enabled { "enabled" } else { "disabled" });
    field("Source", &config.rates.source_url);
    field("Poll interval (s)", config.rates.poll_interval_secs);

    section("Chain");
    field("Mode", format!("{:?}", config.chain.mode));
    field("RPC", &config.chain.rpc_url);
    field("Chain ID", config.chain.chain_id);
    field("Race contract", &config.chain.contract_address);
    field("Rates contract", config.chain.rates_contract());
    field("Owner", &config.chain.owner_address);
    field(
        "Owner key",
        if config.chain.owner_key.is_some() { "set" } else { "not set" },
    );

    section("Bots");
    if config.bots.is_empty() {
        println!("(none)");
    }
    for bot in &config.bots {
        field(&bot.id, format!("{} {}", bot.name, bot.address));
    }
    Ok(())
}

/// Execute `config validate`.
pub fn execute_validate(path: &Path) -> Result<()> {
    Config::load(path)?;
    println!("Configuration valid: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_and_validates() {
        let config = Config::parse_toml(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.race.seat_counts, [2, 4, 6]);
        assert_eq!(config.storage, StorageConfig::Memory);
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        execute_init(&path, false).unwrap();
        assert!(execute_init(&path, false).is_err());
        execute_init(&path, true).unwrap();
        execute_validate(&path).unwrap();
    }
}
