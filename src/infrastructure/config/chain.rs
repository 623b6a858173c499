//! Chain connection configuration.
//!
//! Private keys are never read from the config file. The file names the
//! environment variable that holds each key.

use serde::Deserialize;

use crate::domain::{ChainAccount, KeyRef};
use crate::error::{ConfigError, Result};

/// How chain calls are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainMode {
    /// Log calls and return synthetic hashes.
    #[default]
    DryRun,
    /// Sign and broadcast to an EVM node (requires the `evm` feature).
    Evm,
}

/// `[chain]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub mode: ChainMode,
    pub rpc_url: String,
    pub chain_id: u64,
    pub contract_address: String,
    /// Rate oracle contract. Defaults to `contract_address`.
    pub rates_contract_address: Option<String>,
    /// Address of the backend owner account.
    pub owner_address: String,
    /// Environment variable holding the owner's private key.
    pub owner_key_env: String,
    #[serde(skip)]
    pub owner_key: Option<String>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            mode: ChainMode::DryRun,
            rpc_url: "http://localhost:8545".to_string(),
            chain_id: 1,
            contract_address: String::new(),
            rates_contract_address: None,
            owner_address: "0x0000000000000000000000000000000000000000".to_string(),
            owner_key_env: "RACETRACK_OWNER_KEY".to_string(),
            owner_key: None,
        }
    }
}

impl ChainConfig {
    /// Read the owner key from the configured environment variable.
    pub fn load_secrets(&mut self) {
        self.owner_key = std::env::var(&self.owner_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
    }

    #[must_use]
    pub fn rates_contract(&self) -> &str {
        self.rates_contract_address
            .as_deref()
            .unwrap_or(&self.contract_address)
    }

    /// # Errors
    ///
    /// Missing RPC settings, contract address or owner key in `evm` mode.
    pub fn validate(&self) -> Result<()> {
        if self.owner_address.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "owner_address",
            }
            .into());
        }
        if self.mode == ChainMode::Evm {
            if self.rpc_url.trim().is_empty() {
                return Err(ConfigError::MissingField { field: "rpc_url" }.into());
            }
            if self.contract_address.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "contract_address",
                }
                .into());
            }
            if self.owner_key.is_none() {
                return Err(ConfigError::MissingField {
                    field: "owner_key_env",
                }
                .into());
            }
        }
        Ok(())
    }

    /// The account that signs backend calls.
    #[must_use]
    pub fn owner(&self) -> ChainAccount {
        ChainAccount::new(
            &self.owner_address,
            KeyRef::new(self.owner_key.clone().unwrap_or_default()),
        )
    }
}
