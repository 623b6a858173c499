//! Blockchain client port.
//!
//! The engine mirrors every race transition on the race contract. The
//! client only has to sign and broadcast a call with the nonce it is given;
//! nonce selection is handled by
//! [`NonceSequencer`](crate::application::nonce::NonceSequencer).

use std::fmt;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Address, Asset, ChainAccount, RateSnapshot, TrackId};
use crate::error::ChainError;

/// A race contract call.
#[derive(Debug, Clone, PartialEq)]
pub enum RaceCall {
    /// Register a backend-seeded track. Signed by the owner account.
    CreateTrackFromBackend {
        track_id: TrackId,
        bet_amount: Decimal,
        max_players: usize,
        duration: i64,
    },
    /// Register a user-created track; the creator pays the bet.
    CreateTrack {
        track_id: TrackId,
        bet_amount: Decimal,
    },
    /// Take a seat; the joiner pays the bet.
    JoinTrack {
        track_id: TrackId,
        bet_amount: Decimal,
    },
    SetPortfolio {
        track_id: TrackId,
        assets: Vec<Asset>,
    },
    /// Mark a track started at `start`. Signed by the owner account.
    StartTrack { track_id: TrackId, start: i64 },
    /// Publish the rate snapshot of one bucket. Signed by the owner account.
    SetRates { bucket: i64, rates: RateSnapshot },
    /// Pay out the caller's winnings from a finished track.
    WithdrawRewards { track_id: TrackId },
}

impl RaceCall {
    /// Contract method name, used in logs.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::CreateTrackFromBackend { .. } => "createTrackFromBack",
            Self::CreateTrack { .. } => "createTrack",
            Self::JoinTrack { .. } => "joinToTrack",
            Self::SetPortfolio { .. } => "setPortfolio",
            Self::StartTrack { .. } => "startTrack",
            Self::SetRates { .. } => "setRates",
            Self::WithdrawRewards { .. } => "withdrawRewards",
        }
    }
}

/// A call bound to a signing account and nonce.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRequest {
    pub from: ChainAccount,
    pub nonce: u64,
    pub call: RaceCall,
}

/// Hash returned once a transaction has been accepted for broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Number of transactions sent from `address`, including pending ones.
    async fn pending_nonce(&self, address: &Address) -> Result<u64, ChainError>;

    /// Sign and broadcast. Resolves once the node returns a hash.
    async fn submit(&self, tx: TransactionRequest) -> Result<TxHash, ChainError>;
}
