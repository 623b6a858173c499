//! Persistence ports for tracks, portfolios and users.

use async_trait::async_trait;

use crate::domain::{Portfolio, Track, TrackId, TrackStatus, User, UserId};
use crate::error::Result;

/// Result of a compare-and-swap save.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// The write landed. Carries the track with its new version.
    Saved(Track),
    /// Someone else saved first; the caller must re-read and retry.
    Stale,
}

impl SaveOutcome {
    #[must_use]
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }
}

/// Storage operations for tracks.
#[async_trait]
pub trait TrackStore: Send + Sync {
    /// Get a track by ID.
    async fn get(&self, id: &TrackId) -> Result<Option<Track>>;

    /// Store a brand new track.
    async fn insert(&self, track: &Track) -> Result<()>;

    /// Save a track only if the stored version still equals `track.version`.
    async fn save(&self, track: &Track) -> Result<SaveOutcome>;

    /// All tracks in the given status.
    async fn list_by_status(&self, status: TrackStatus) -> Result<Vec<Track>>;

    /// An awaiting track the user is already seated in, if any.
    async fn find_awaiting_with_member(&self, user: &UserId) -> Result<Option<Track>>;

    /// Up to `limit` tracks, newest first.
    async fn list(&self, limit: usize) -> Result<Vec<Track>>;

    /// Every track the user created, newest first.
    async fn tracks_by_creator(&self, creator: &UserId) -> Result<Vec<Track>>;
}

/// Storage operations for portfolios.
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    /// Insert a portfolio. Returns `false` if one already exists for the
    /// same (track, user) pair, leaving the stored one untouched.
    async fn insert(&self, portfolio: &Portfolio) -> Result<bool>;

    async fn get(&self, track_id: &TrackId, user_id: &UserId) -> Result<Option<Portfolio>>;

    async fn list_for_track(&self, track_id: &TrackId) -> Result<Vec<Portfolio>>;
}

/// Lookup of already-registered users and the reserved bot accounts.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;

    /// The pre-provisioned bot accounts used for backfill.
    async fn bots(&self) -> Result<Vec<User>>;
}
