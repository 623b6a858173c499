//! Handler for the `run` command.

use tracing::info;

use crate::cli::RunArgs;
use crate::error::Result;
use crate::infrastructure::config::chain::ChainMode;
use crate::infrastructure::config::storage::StorageConfig;
use crate::infrastructure::config::Config;
use crate::infrastructure::runtime;

/// Apply command-line overrides on top of the loaded file.
pub fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }
    if args.dry_run {
        config.chain.mode = ChainMode::DryRun;
    }
    if let Some(ref path) = args.database {
        config.storage = StorageConfig::Sqlite { path: path.clone() };
    }
}

/// Execute the run command.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;
    apply_overrides(&mut config, args);
    config.validate()?;
    config.init_logging();

    info!(
        config = %args.config.display(),
        seat_counts = ?config.race.seat_counts,
        duration_secs = config.race.duration_secs,
        "racetrack starting"
    );
    runtime::run(config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args() -> RunArgs {
        RunArgs {
            config: PathBuf::from("config.toml"),
            log_level: None,
            json_logs: false,
            dry_run: false,
            database: None,
        }
    }

    #[test]
    fn no_flags_change_nothing() {
        let mut config = Config::default();
        apply_overrides(&mut config, &args());
        assert_eq!(config.logging.level, "info");
        assert!(matches!(config.storage, StorageConfig::Memory));
    }

    #[test]
    fn flags_override_file_values() {
        let mut config = Config::default();
        config.chain.mode = ChainMode::Evm;
        let args = RunArgs {
            log_level: Some("debug".into()),
            json_logs: true,
            dry_run: true,
            database: Some("races.db".into()),
            ..args()
        };
        apply_overrides(&mut config, &args);

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.chain.mode, ChainMode::DryRun);
        assert!(matches!(config.storage, StorageConfig::Sqlite { ref path } if path == "races.db"));
    }
}
