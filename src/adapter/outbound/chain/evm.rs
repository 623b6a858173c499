//! Race contract client over JSON-RPC.
//!
//! Every call is signed locally with the sending account's key and sent
//! with the nonce chosen by the sequencer. The call resolves as soon as the
//! node returns a transaction hash; receipts are not awaited.

use std::str::FromStr;

use alloy_primitives::{keccak256, Address as EvmAddress, FixedBytes, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::sol;
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::{Address, Asset, RateSnapshot, TrackId};
use crate::error::{ChainError, ConfigError, Result};
use crate::port::{ChainClient, RaceCall, TransactionRequest, TxHash};

/// Gas limit attached to every race call.
const GAS_LIMIT: u64 = 2_000_000;

/// Rates are sent as fixed-point integers with this many decimals.
const RATE_DECIMALS: u32 = 8;

sol! {
    #[sol(rpc)]
    contract RaceBase {
        function createTrackFromBack(bytes32 id, uint256 betAmount) external;
        function createTrack(bytes32 id) external payable;
        function joinToTrack(bytes32 id) external payable;
        function setPortfolio(bytes32 id, bytes32[] names, uint256[] amounts) external;
        function startTrack(bytes32 id, uint256 start) external;
        function withdrawRewards(bytes32 id) external;
    }

    #[sol(rpc)]
    contract RateOracle {
        function setRates(uint256 bucket, bytes32[] names, uint256[] rates) external;
    }
}

/// [`ChainClient`] backed by an EVM node.
pub struct EvmChainClient {
    rpc_url: url::Url,
    chain_id: u64,
    race: EvmAddress,
    rates: EvmAddress,
}

fn invalid(field: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

/// Contract-side track identifier: keccak256 of the track id string.
fn track_key(id: &TrackId) -> FixedBytes<32> {
    keccak256(id.as_str().as_bytes())
}

/// Right-pad a short ASCII name into a `bytes32`.
fn name_bytes(name: &str) -> FixedBytes<32> {
    let mut buf = [0u8; 32];
    let bytes = name.as_bytes();
    let n = bytes.len().min(32);
    buf[..n].copy_from_slice(&bytes[..n]);
    FixedBytes::from(buf)
}

/// Scale a decimal amount to an integer with `decimals` places.
fn scaled(amount: Decimal, decimals: u32) -> U256 {
    let scaled = amount * Decimal::from(10u64.pow(decimals.min(19)));
    let extra = decimals.saturating_sub(19);
    let base = U256::from(scaled.trunc().to_string().parse::<u128>().unwrap_or(0));
    base * U256::from(10u64).pow(U256::from(extra))
}

fn wei(amount: Decimal) -> U256 {
    scaled(amount, 18)
}

fn portfolio_args(assets: &[Asset]) -> (Vec<FixedBytes<32>>, Vec<U256>) {
    assets
        .iter()
        .map(|a| (name_bytes(a.name.name()), U256::from(a.value)))
        .unzip()
}

fn rate_args(rates: &RateSnapshot) -> (Vec<FixedBytes<32>>, Vec<U256>) {
    rates
        .iter()
        .map(|(symbol, usd)| {
            let fixed = Decimal::from_f64_retain(usd).unwrap_or_default();
            (name_bytes(symbol), scaled(fixed, RATE_DECIMALS))
        })
        .unzip()
}

/// Sort a node error into the sequencer's categories.
fn classify(message: String) -> ChainError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("nonce too low")
        || lower.contains("already known")
        || lower.contains("replacement transaction underpriced")
    {
        ChainError::NonceTooLow(message)
    } else if lower.contains("connection")
        || lower.contains("timed out")
        || lower.contains("transport")
    {
        ChainError::Transport(message)
    } else {
        ChainError::Rejected(message)
    }
}

impl EvmChainClient {
    /// # Errors
    ///
    /// Returns a config error if the RPC URL or a contract address is invalid.
    pub fn new(rpc_url: &str, chain_id: u64, race_contract: &str, rates_contract: &str) -> Result<Self> {
        Ok(Self {
            rpc_url: rpc_url.parse().map_err(|e| invalid("chain.rpc_url", e))?,
            chain_id,
            race: EvmAddress::from_str(race_contract).map_err(|e| invalid("chain.contract_address", e))?,
            rates: EvmAddress::from_str(rates_contract)
                .map_err(|e| invalid("chain.rates_contract_address", e))?,
        })
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    async fn pending_nonce(&self, address: &Address) -> std::result::Result<u64, ChainError> {
        let address = EvmAddress::from_str(address.as_str()).map_err(|e| ChainError::Rejected(e.to_string()))?;
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.clone());
        provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(|e| classify(e.to_string()))
    }

    async fn submit(&self, tx: TransactionRequest) -> std::result::Result<TxHash, ChainError> {
        let signer = PrivateKeySigner::from_str(tx.from.key.expose())
            .map_err(|e| ChainError::Rejected(format!("bad signing key: {e}")))?
            .with_chain_id(Some(self.chain_id));
        let wallet = alloy_provider::network::EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(self.rpc_url.clone());
        let race = RaceBase::new(self.race, &provider);
        let oracle = RateOracle::new(self.rates, &provider);
        let nonce = tx.nonce;

        macro_rules! send {
            ($builder:expr) => {
                $builder
                    .nonce(nonce)
                    .gas(GAS_LIMIT)
                    .send()
                    .await
                    .map(|pending| *pending.tx_hash())
                    .map_err(|e| classify(e.to_string()))
            };
        }

        let hash = match &tx.call {
            RaceCall::CreateTrackFromBackend {
                track_id,
                bet_amount,
                ..
            } => send!(race.createTrackFromBack(track_key(track_id), wei(*bet_amount)))?,
            RaceCall::CreateTrack {
                track_id,
                bet_amount,
            } => send!(race.createTrack(track_key(track_id)).value(wei(*bet_amount)))?,
            RaceCall::JoinTrack {
                track_id,
                bet_amount,
            } => send!(race.joinToTrack(track_key(track_id)).value(wei(*bet_amount)))?,
            RaceCall::SetPortfolio { track_id, assets } => {
                let (names, amounts) = portfolio_args(assets);
                send!(race.setPortfolio(track_key(track_id), names, amounts))?
            }
            RaceCall::StartTrack { track_id, start } => send!(race.startTrack(
                track_key(track_id),
                U256::from(u64::try_from(*start).unwrap_or(0))
            ))?,
            RaceCall::SetRates { bucket, rates } => {
                let (names, values) = rate_args(rates);
                send!(oracle.setRates(U256::from(u64::try_from(*bucket).unwrap_or(0)), names, values))?
            }
            RaceCall::WithdrawRewards { track_id } => {
                send!(race.withdrawRewards(track_key(track_id)))?
            }
        };

        let hash = TxHash::new(format!("{hash:?}"));
        debug!(method = tx.call.method(), nonce, tx = %hash, "Transaction broadcast");
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn classifies_nonce_errors() {
        assert!(matches!(
            classify("server returned an error response: nonce too low".into()),
            ChainError::NonceTooLow(_)
        ));
        assert!(matches!(
            classify("execution reverted".into()),
            ChainError::Rejected(_)
        ));
        assert!(matches!(
            classify("error sending request: connection refused".into()),
            ChainError::Transport(_)
        ));
    }

    #[test]
    fn bet_is_converted_to_wei() {
        assert_eq!(wei(dec!(0.01)), U256::from(10_000_000_000_000_000u128));
    }

    #[test]
    fn names_are_right_padded() {
        let bytes = name_bytes("btc");
        assert_eq!(&bytes[..3], b"btc");
        assert!(bytes[3..].iter().all(|b| *b == 0));
    }

    #[test]
    fn track_key_is_keccak_of_id() {
        let id = TrackId::from("abc");
        assert_eq!(track_key(&id), keccak256(b"abc"));
    }
}
