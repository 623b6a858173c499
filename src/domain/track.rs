//! Track (race session) aggregate and its state transitions.
//!
//! The transitions here are pure: they validate and mutate an in-memory
//! [`Track`]. Persisting the result with compare-and-swap is the job of
//! the race state machine in the application layer.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::asset::AssetMix;
use super::id::{TrackId, UserId};
use super::score::FinalStanding;
use super::time::align_to_bucket;
use crate::error::RaceError;

/// Lifecycle status of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    Awaiting,
    Active,
    Finished,
    /// Reserved terminal state; no current flow enters it.
    Cancelled,
}

impl TrackStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Awaiting => "awaiting",
            Self::Active => "active",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TrackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TrackStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting" => Ok(Self::Awaiting),
            "active" => Ok(Self::Active),
            "finished" => Ok(Self::Finished),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown track status '{other}'")),
        }
    }
}

/// Who created the track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Created by a player, who pays the bet on creation.
    User,
    /// Seeded by the backend so the lobby always has open races.
    Backend,
}

impl TrackKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Backend => "backend",
        }
    }
}

impl std::str::FromStr for TrackKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "backend" => Ok(Self::Backend),
            other => Err(format!("unknown track kind '{other}'")),
        }
    }
}

/// Snapshot of a seated player as shown to race clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: UserId,
    pub name: String,
    /// Starting lane (the "ship" in client terms).
    pub lane: u8,
    /// Starting fuel, i.e. the committed asset mix.
    pub fuel: AssetMix,
}

/// A race instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    pub bet_amount: Decimal,
    pub kind: TrackKind,
    pub creator: Option<UserId>,
    pub status: TrackStatus,
    pub num_players: usize,
    pub max_players: usize,
    /// Unix seconds; zero until the track is active.
    pub start: i64,
    /// Unix seconds; zero until the track is active.
    pub end: i64,
    /// Race length in seconds.
    pub duration: i64,
    pub created_at: i64,
    pub users: Vec<UserId>,
    pub players: Vec<PlayerSnapshot>,
    pub winners: Vec<FinalStanding>,
    /// Document revision; bumped by the store on every successful save.
    pub version: u64,
}

impl Track {
    /// Create an empty awaiting track.
    #[must_use]
    pub fn new(
        bet_amount: Decimal,
        max_players: usize,
        duration: i64,
        kind: TrackKind,
        creator: Option<UserId>,
        created_at: i64,
    ) -> Self {
        Self {
            id: TrackId::new(),
            bet_amount,
            kind,
            creator,
            status: TrackStatus::Awaiting,
            num_players: 0,
            max_players,
            start: 0,
            end: 0,
            duration,
            created_at,
            users: Vec::new(),
            players: Vec::new(),
            winners: Vec::new(),
            version: 0,
        }
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.num_players >= self.max_players
    }

    #[must_use]
    pub fn has_member(&self, user: &UserId) -> bool {
        self.users.contains(user)
    }

    #[must_use]
    pub fn lane_of(&self, user: &UserId) -> Option<u8> {
        self.players.iter().find(|p| &p.id == user).map(|p| p.lane)
    }

    /// Seat a player.
    ///
    /// # Errors
    ///
    /// [`RaceError::TrackNotJoinable`] if the track is not awaiting, is full,
    /// or already seats this user.
    pub fn seat(&mut self, player: PlayerSnapshot) -> Result<(), RaceError> {
        if self.status != TrackStatus::Awaiting {
            return Err(RaceError::not_joinable(
                &self.id,
                format!("status is {}", self.status),
            ));
        }
        if self.is_full() {
            return Err(RaceError::not_joinable(&self.id, "all seats are taken"));
        }
        if self.has_member(&player.id) {
            return Err(RaceError::not_joinable(&self.id, "already seated"));
        }
        self.users.push(player.id.clone());
        self.players.push(player);
        self.num_players = self.users.len();
        Ok(())
    }

    /// Give a seat back while the track is still awaiting.
    ///
    /// Returns `false` if the user held no seat or the track already left
    /// the awaiting state.
    pub fn unseat(&mut self, user: &UserId) -> bool {
        if self.status != TrackStatus::Awaiting || !self.has_member(user) {
            return false;
        }
        self.users.retain(|u| u != user);
        self.players.retain(|p| &p.id != user);
        self.num_players = self.users.len();
        true
    }

    /// Move an awaiting, full track to active.
    ///
    /// `start` is the next bucket boundary at or after `now`.
    ///
    /// # Errors
    ///
    /// [`RaceError::TrackNotJoinable`] if the track is not awaiting or not full.
    pub fn activate(&mut self, now: i64) -> Result<(), RaceError> {
        if self.status != TrackStatus::Awaiting || !self.is_full() {
            return Err(RaceError::not_joinable(&self.id, "track cannot start"));
        }
        self.status = TrackStatus::Active;
        self.start = align_to_bucket(now);
        self.end = self.start + self.duration;
        Ok(())
    }

    /// Attach final standings and mark the track finished.
    ///
    /// # Errors
    ///
    /// [`RaceError::TrackNotActive`] unless the track is active.
    pub fn finish(&mut self, winners: Vec<FinalStanding>) -> Result<(), RaceError> {
        if self.status != TrackStatus::Active {
            return Err(RaceError::TrackNotActive(self.id.clone()));
        }
        self.status = TrackStatus::Finished;
        self.winners = winners;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asset::{Asset, Ticker};
    use rust_decimal_macros::dec;

    fn player(id: &str) -> PlayerSnapshot {
        PlayerSnapshot {
            id: UserId::new(id),
            name: id.to_string(),
            lane: 0,
            fuel: AssetMix::new(vec![Asset::new(Ticker::Btc, 100)]).unwrap(),
        }
    }

    fn track(max: usize) -> Track {
        Track::new(dec!(1000), max, 300, TrackKind::User, None, 0)
    }

    #[test]
    fn new_track_is_awaiting_and_unscheduled() {
        let t = track(4);
        assert_eq!(t.status, TrackStatus::Awaiting);
        assert_eq!((t.start, t.end), (0, 0));
        assert_eq!(t.num_players, 0);
    }

    #[test]
    fn seating_keeps_num_players_in_sync() {
        let mut t = track(2);
        t.seat(player("a")).unwrap();
        t.seat(player("b")).unwrap();
        assert_eq!(t.num_players, t.users.len());
        assert!(t.is_full());
        assert!(matches!(
            t.seat(player("c")),
            Err(RaceError::TrackNotJoinable { .. })
        ));
    }

    #[test]
    fn seating_twice_is_rejected() {
        let mut t = track(3);
        t.seat(player("a")).unwrap();
        assert!(t.seat(player("a")).is_err());
        assert_eq!(t.num_players, 1);
    }

    #[test]
    fn unseat_frees_the_seat_only_while_awaiting() {
        let mut t = track(2);
        t.seat(player("a")).unwrap();
        t.seat(player("b")).unwrap();
        assert!(t.unseat(&UserId::new("a")));
        assert_eq!(t.num_players, 1);
        assert!(!t.has_member(&UserId::new("a")));
        assert_eq!(t.players.len(), 1);
        assert!(!t.unseat(&UserId::new("a")));

        t.seat(player("a")).unwrap();
        t.activate(0).unwrap();
        assert!(!t.unseat(&UserId::new("b")));
        assert_eq!(t.num_players, 2);
    }

    #[test]
    fn activation_aligns_start_and_sets_end() {
        let mut t = track(1);
        t.seat(player("a")).unwrap();
        t.activate(1_700_000_002).unwrap();
        assert_eq!(t.status, TrackStatus::Active);
        assert_eq!(t.start, 1_700_000_005);
        assert_eq!(t.end, t.start + 300);
    }

    #[test]
    fn activation_requires_full_track() {
        let mut t = track(2);
        t.seat(player("a")).unwrap();
        assert!(t.activate(10).is_err());
        assert_eq!(t.start, 0);
    }

    #[test]
    fn finish_requires_active() {
        let mut t = track(1);
        assert!(matches!(t.finish(vec![]), Err(RaceError::TrackNotActive(_))));
        t.seat(player("a")).unwrap();
        t.activate(0).unwrap();
        t.finish(vec![]).unwrap();
        assert_eq!(t.status, TrackStatus::Finished);
        assert!(t.finish(vec![]).is_err());
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            TrackStatus::Awaiting,
            TrackStatus::Active,
            TrackStatus::Finished,
            TrackStatus::Cancelled,
        ] {
            assert_eq!(s.as_str().parse::<TrackStatus>().unwrap(), s);
        }
    }
}
