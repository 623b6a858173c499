//! Race domain: tracks, portfolios, assets and scoring.
//!
//! Everything here is synchronous and free of I/O.

pub mod asset;
pub mod error;
pub mod id;
pub mod portfolio;
pub mod score;
pub mod time;
pub mod track;
pub mod user;

pub use asset::{Asset, AssetMix, RateSnapshot, Ticker};
pub use error::AssetMixError;
pub use id::{Address, JobId, TrackId, UserId};
pub use portfolio::Portfolio;
pub use score::{FinalStanding, Ratios, RewardPolicy, Standing};
pub use time::{align_to_bucket, BUCKET_SECS};
pub use track::{PlayerSnapshot, Track, TrackKind, TrackStatus};
pub use user::{ChainAccount, KeyRef, User};
