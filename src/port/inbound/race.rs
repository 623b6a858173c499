//! Race operations exposed to the transport layer.

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Asset, AssetMix, AssetMixError, Portfolio, Standing, Track, TrackId, User};
use crate::error::Result;
use crate::port::outbound::chain::TxHash;
use crate::port::outbound::transport::RaceInit;

/// How a client describes its portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetInput {
    /// Fuel slots as sent by race clients (see [`AssetMix::from_fuel`]).
    Fuel(Vec<u32>),
    /// Explicit named assets.
    Assets(Vec<Asset>),
}

impl AssetInput {
    /// Resolve into a validated mix.
    ///
    /// # Errors
    ///
    /// Any [`AssetMixError`] from validation.
    pub fn into_mix<R: Rng + ?Sized>(self, rng: &mut R) -> std::result::Result<AssetMix, AssetMixError> {
        match self {
            Self::Fuel(fuel) => AssetMix::from_fuel(&fuel, rng),
            Self::Assets(assets) => AssetMix::new(assets),
        }
    }
}

#[async_trait]
pub trait RaceApi: Send + Sync {
    /// List tracks, topping up backend tracks so every configured seat
    /// count has enough awaiting ones.
    async fn get_tracks(&self) -> Result<Vec<Track>>;

    /// Seat `user` on a track with the given portfolio and lane.
    async fn join_track(
        &self,
        user: &User,
        track_id: &TrackId,
        assets: AssetInput,
        lane: u8,
    ) -> Result<Track>;

    /// Race init payload for a client (re)connecting to an active track.
    async fn load_track(&self, user: &User, track_id: &TrackId) -> Result<RaceInit>;

    /// Create a backend-owned track.
    async fn internal_create_track(&self, bet_amount: Decimal, max_players: usize) -> Result<Track>;

    /// Create a track on behalf of a user, who pays the bet.
    async fn create_track(&self, user: &User, bet_amount: Decimal, max_players: usize) -> Result<Track>;

    /// Ranked standings between `start` and `end` (defaults to the track's end).
    async fn get_stats(&self, track_id: &TrackId, end: Option<i64>) -> Result<Vec<Standing>>;

    async fn get_portfolio(&self, user: &User, track_id: &TrackId) -> Result<Option<Portfolio>>;

    /// Tracks `user` created, newest first.
    async fn get_tracks_by_user(&self, user: &User) -> Result<Vec<Track>>;

    /// Ask the race contract to pay out `user`'s winnings on a finished
    /// track. Signed with the user's own account.
    async fn get_rewards(&self, user: &User, track_id: &TrackId) -> Result<TxHash>;
}
