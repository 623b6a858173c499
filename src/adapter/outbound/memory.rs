//! In-memory implementations of the storage ports.
//!
//! Used as the default backend and throughout the tests. Track writes are
//! compare-and-swap on the version exactly like the SQLite store, so
//! concurrency behavior matches between the two.

use std::cmp::Reverse;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::domain::{Portfolio, Track, TrackId, TrackStatus, User, UserId};
use crate::error::{Error, RaceError, Result};
use crate::port::{PortfolioStore, SaveOutcome, TrackStore, UserDirectory};

#[derive(Default)]
pub struct MemoryStore {
    tracks: DashMap<TrackId, Track>,
    portfolios: DashMap<(TrackId, UserId), Portfolio>,
    users: DashMap<UserId, User>,
    bots: RwLock<Vec<User>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    /// Register a bot account. Bots are also resolvable as users.
    pub fn add_bot(&self, bot: User) {
        let bot = bot.into_bot();
        self.users.insert(bot.id.clone(), bot.clone());
        self.bots.write().push(bot);
    }

    /// Number of stored tracks.
    #[must_use]
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }
}

#[async_trait]
impl TrackStore for MemoryStore {
    async fn get(&self, id: &TrackId) -> Result<Option<Track>> {
        Ok(self.tracks.get(id).map(|t| t.clone()))
    }

    async fn insert(&self, track: &Track) -> Result<()> {
        match self.tracks.entry(track.id.clone()) {
            Entry::Occupied(_) => Err(Error::Database(format!("track {} already exists", track.id))),
            Entry::Vacant(slot) => {
                slot.insert(track.clone());
                Ok(())
            }
        }
    }

    async fn save(&self, track: &Track) -> Result<SaveOutcome> {
        let Some(mut stored) = self.tracks.get_mut(&track.id) else {
            return Err(RaceError::TrackNotFound(track.id.clone()).into());
        };
        if stored.version != track.version {
            return Ok(SaveOutcome::Stale);
        }
        let mut next = track.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(SaveOutcome::Saved(next))
    }

    async fn list_by_status(&self, status: TrackStatus) -> Result<Vec<Track>> {
        let mut tracks: Vec<Track> = self
            .tracks
            .iter()
            .filter(|t| t.status == status)
            .map(|t| t.clone())
            .collect();
        tracks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(tracks)
    }

    async fn find_awaiting_with_member(&self, user: &UserId) -> Result<Option<Track>> {
        Ok(self
            .tracks
            .iter()
            .find(|t| t.status == TrackStatus::Awaiting && t.has_member(user))
            .map(|t| t.clone()))
    }

    async fn list(&self, limit: usize) -> Result<Vec<Track>> {
        let mut tracks: Vec<Track> = self.tracks.iter().map(|t| t.clone()).collect();
        tracks.sort_by_key(|t| (Reverse(t.created_at), t.id.clone()));
        tracks.truncate(limit);
        Ok(tracks)
    }

    async fn tracks_by_creator(&self, creator: &UserId) -> Result<Vec<Track>> {
        let mut tracks: Vec<Track> = self
            .tracks
            .iter()
            .filter(|t| t.creator.as_ref() == Some(creator))
            .map(|t| t.clone())
            .collect();
        tracks.sort_by_key(|t| (Reverse(t.created_at), t.id.clone()));
        Ok(tracks)
    }
}

#[async_trait]
impl PortfolioStore for MemoryStore {
    async fn insert(&self, portfolio: &Portfolio) -> Result<bool> {
        let key = (portfolio.track_id.clone(), portfolio.user_id.clone());
        match self.portfolios.entry(key) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(portfolio.clone());
                Ok(true)
            }
        }
    }

    async fn get(&self, track_id: &TrackId, user_id: &UserId) -> Result<Option<Portfolio>> {
        let key = (track_id.clone(), user_id.clone());
        Ok(self.portfolios.get(&key).map(|p| p.clone()))
    }

    async fn list_for_track(&self, track_id: &TrackId) -> Result<Vec<Portfolio>> {
        let mut portfolios: Vec<Portfolio> = self
            .portfolios
            .iter()
            .filter(|p| &p.track_id == track_id)
            .map(|p| p.clone())
            .collect();
        portfolios.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(portfolios)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn bots(&self) -> Result<Vec<User>> {
        Ok(self.bots.read().clone())
    }
}
