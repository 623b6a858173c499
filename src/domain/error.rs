//! Domain validation errors.
//!
//! Returned by constructors that validate inputs before a value may enter
//! the race lifecycle.

use thiserror::Error;

/// Reasons an asset mix is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetMixError {
    /// A portfolio must name at least one asset.
    #[error("asset list cannot be empty")]
    Empty,

    /// The asset name is not one of the supported tickers.
    #[error("unknown asset '{0}'")]
    UnknownAsset(String),

    /// The same ticker appears more than once.
    #[error("asset '{0}' listed more than once")]
    DuplicateAsset(String),

    /// Percentages must add up to exactly 100.
    #[error("percentages sum to {sum}, expected 100")]
    BadTotal {
        /// The actual sum of the provided percentages.
        sum: u32,
    },
}
