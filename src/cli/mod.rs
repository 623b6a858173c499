//! Command-line interface definitions.

pub mod config;
pub mod run;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Racetrack - timed multiplayer portfolio races.
#[derive(Parser, Debug)]
#[command(name = "racetrack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the race engine (foreground)
    Run(RunArgs),

    /// Inspect and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Subcommands for `racetrack config`
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a documented config file
    Init(InitArgs),
    /// Print the effective configuration
    Show(ConfigPathArg),
    /// Validate a configuration file
    Validate(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `config init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Where to write the file
    #[arg(default_value = "config.toml")]
    pub path: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,

    /// Never broadcast transactions, whatever the config says
    #[arg(long)]
    pub dry_run: bool,

    /// Override the SQLite database path (implies sqlite storage)
    #[arg(long)]
    pub database: Option<String>,
}
