use thiserror::Error;

use crate::domain::error::AssetMixError;
use crate::domain::id::{Address, TrackId, UserId};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Race lifecycle errors surfaced to callers and job handlers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RaceError {
    #[error("track {0} not found")]
    TrackNotFound(TrackId),

    #[error("track {track_id} is not joinable: {reason}")]
    TrackNotJoinable { track_id: TrackId, reason: String },

    #[error("invalid track parameters: {0}")]
    InvalidTrack(String),

    #[error("track {0} is not active")]
    TrackNotActive(TrackId),

    #[error("no rewards to withdraw on track {track_id}: {reason}")]
    RewardsUnavailable { track_id: TrackId, reason: String },

    #[error("portfolio already set for user {user_id} on track {track_id}")]
    PortfolioAlreadySet { track_id: TrackId, user_id: UserId },

    #[error("invalid asset mix: {0}")]
    InvalidAssetMix(#[from] AssetMixError),

    #[error("rates unavailable for bucket {bucket}{}", ticker.as_ref().map(|t| format!(" ({t})")).unwrap_or_default())]
    RateUnavailable { bucket: i64, ticker: Option<String> },

    #[error("nonce {nonce} already used for {address}")]
    NonceConflict { address: Address, nonce: u64 },

    #[error("chain submission failed: {0}")]
    ChainSubmissionFailed(String),
}

impl RaceError {
    pub(crate) fn not_joinable(track_id: &TrackId, reason: impl Into<String>) -> Self {
        Self::TrackNotJoinable {
            track_id: track_id.clone(),
            reason: reason.into(),
        }
    }

    pub(crate) fn rate_unavailable(bucket: i64) -> Self {
        Self::RateUnavailable {
            bucket,
            ticker: None,
        }
    }
}

/// Failures reported by a chain client when submitting a transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// The chain has already seen this nonce for the account.
    #[error("nonce too low: {0}")]
    NonceTooLow(String),

    /// The node refused the transaction (bad signature, revert, underpriced).
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// The node could not be reached or returned garbage.
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Race(#[from] RaceError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Return the race error if this is one.
    #[must_use]
    pub fn as_race(&self) -> Option<&RaceError> {
        match self {
            Self::Race(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
