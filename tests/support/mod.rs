//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use racetrack::domain::{Asset, Ticker};
use racetrack::port::AssetInput;
use tempfile::TempDir;

/// A config file in its own temporary directory. The directory is removed
/// when the value is dropped.
pub struct TempConfig {
    _dir: TempDir,
    pub path: PathBuf,
}

pub fn write_temp_config(contents: &str) -> TempConfig {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    fs::write(&path, contents).expect("write temp config");
    TempConfig { _dir: dir, path }
}

/// A BTC/ETH portfolio as a client would submit it.
pub fn btc_eth(btc: u32, eth: u32) -> AssetInput {
    AssetInput::Assets(vec![Asset::new(Ticker::Btc, btc), Asset::new(Ticker::Eth, eth)])
}
