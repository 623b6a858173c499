//! Persisted track transitions.
//!
//! Every write is a compare-and-swap on the track version. A stale write
//! re-reads the track and re-validates before trying again, so concurrent
//! joins never oversubscribe a track and exactly one caller observes the
//! AWAITING to ACTIVE transition.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::domain::{
    AssetMix, FinalStanding, PlayerSnapshot, Portfolio, Track, TrackId, TrackKind, TrackStatus,
    User, UserId,
};
use crate::error::{RaceError, Result};
use crate::port::{Clock, PortfolioStore, SaveOutcome, TrackStore};

/// Result of [`RaceMachine::try_activate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// This call moved the track to ACTIVE.
    Activated(Track),
    /// Seats or portfolios are still missing.
    NotReady(Track),
    /// Another caller already activated (or finished) the track.
    AlreadyActive(Track),
}

/// Result of [`RaceMachine::finish`].
#[derive(Debug, Clone, PartialEq)]
pub enum Finish {
    /// This call moved the track to FINISHED.
    Finished(Track),
    AlreadyFinished,
}

pub struct RaceMachine {
    tracks: Arc<dyn TrackStore>,
    portfolios: Arc<dyn PortfolioStore>,
    clock: Arc<dyn Clock>,
    retry_limit: u32,
    /// Users with a join in flight, keyed to the track they are joining.
    joining: DashMap<UserId, TrackId>,
}

/// Holds a user's in-flight join; dropping it lets the user join again.
struct JoinClaim<'a> {
    joining: &'a DashMap<UserId, TrackId>,
    user: UserId,
}

impl Drop for JoinClaim<'_> {
    fn drop(&mut self) {
        self.joining.remove(&self.user);
    }
}

impl RaceMachine {
    pub fn new(
        tracks: Arc<dyn TrackStore>,
        portfolios: Arc<dyn PortfolioStore>,
        clock: Arc<dyn Clock>,
        retry_limit: u32,
    ) -> Self {
        Self {
            tracks,
            portfolios,
            clock,
            retry_limit: retry_limit.max(1),
            joining: DashMap::new(),
        }
    }

    /// Create and store an empty awaiting track.
    ///
    /// # Errors
    ///
    /// [`RaceError::InvalidTrack`] for a zero seat count, a negative bet or
    /// a non-positive duration; storage errors otherwise.
    pub async fn create(
        &self,
        bet_amount: Decimal,
        max_players: usize,
        duration: i64,
        kind: TrackKind,
        creator: Option<UserId>,
    ) -> Result<Track> {
        if max_players == 0 {
            return Err(RaceError::InvalidTrack("max players must be at least 1".into()).into());
        }
        if bet_amount.is_sign_negative() {
            return Err(RaceError::InvalidTrack("bet amount cannot be negative".into()).into());
        }
        if duration <= 0 {
            return Err(RaceError::InvalidTrack("duration must be positive".into()).into());
        }
        let track = Track::new(
            bet_amount,
            max_players,
            duration,
            kind,
            creator,
            self.clock.now(),
        );
        self.tracks.insert(&track).await?;
        info!(track_id = %track.id, max_players, kind = kind.as_str(), "Track created");
        Ok(track)
    }

    /// Load a track.
    ///
    /// # Errors
    ///
    /// [`RaceError::TrackNotFound`] if the id does not resolve.
    pub async fn get(&self, id: &TrackId) -> Result<Track> {
        self.tracks
            .get(id)
            .await?
            .ok_or_else(|| RaceError::TrackNotFound(id.clone()).into())
    }

    /// Seat `user` and record their portfolio.
    ///
    /// # Errors
    ///
    /// [`RaceError::TrackNotJoinable`] when the track is not awaiting, is
    /// full, or the user already sits in (or is joining) an awaiting track.
    /// If the portfolio cannot be stored the seat is given back.
    pub async fn join(
        &self,
        user: &User,
        track_id: &TrackId,
        mix: AssetMix,
        lane: u8,
    ) -> Result<Track> {
        // Held until the seat and portfolio are stored, so the awaiting
        // membership check below cannot race a second join of the same user.
        let _claim = self.claim(&user.id, track_id)?;
        let seated = self.seat(user, track_id, &mix, lane).await?;
        if let Err(e) = self.set_portfolio(track_id, &user.id, mix).await {
            self.release_seat(track_id, &user.id).await;
            return Err(e);
        }
        Ok(seated)
    }

    fn claim(&self, user_id: &UserId, track_id: &TrackId) -> Result<JoinClaim<'_>> {
        match self.joining.entry(user_id.clone()) {
            Entry::Occupied(other) => Err(RaceError::not_joinable(
                track_id,
                format!("user {user_id} is already joining track {}", other.get()),
            )
            .into()),
            Entry::Vacant(slot) => {
                slot.insert(track_id.clone());
                Ok(JoinClaim {
                    joining: &self.joining,
                    user: user_id.clone(),
                })
            }
        }
    }

    /// Undo a seat whose portfolio could not be stored, so the track can
    /// still fill.
    async fn release_seat(&self, track_id: &TrackId, user_id: &UserId) {
        for attempt in 1..=self.retry_limit {
            let mut track = match self.get(track_id).await {
                Ok(track) => track,
                Err(e) => {
                    warn!(track_id = %track_id, user_id = %user_id, error = %e, "Failed to reload track to release seat");
                    return;
                }
            };
            if !track.unseat(user_id) {
                return;
            }
            match self.tracks.save(&track).await {
                Ok(SaveOutcome::Saved(saved)) => {
                    info!(track_id = %track_id, user_id = %user_id, seats = saved.num_players, "Seat released");
                    return;
                }
                Ok(SaveOutcome::Stale) => {
                    debug!(track_id = %track_id, attempt, "Seat release lost a race, retrying");
                }
                Err(e) => {
                    warn!(track_id = %track_id, user_id = %user_id, error = %e, "Failed to release seat");
                    return;
                }
            }
        }
        warn!(track_id = %track_id, user_id = %user_id, "Seat release gave up under contention");
    }

    async fn seat(&self, user: &User, track_id: &TrackId, mix: &AssetMix, lane: u8) -> Result<Track> {
        for attempt in 1..=self.retry_limit {
            let mut track = self.get(track_id).await?;
            if track.status != TrackStatus::Awaiting {
                return Err(RaceError::not_joinable(track_id, format!("status is {}", track.status)).into());
            }
            if track.is_full() {
                return Err(RaceError::not_joinable(track_id, "all seats are taken").into());
            }
            if let Some(other) = self.tracks.find_awaiting_with_member(&user.id).await? {
                return Err(RaceError::not_joinable(
                    track_id,
                    format!("user {} is already waiting in track {}", user.id, other.id),
                )
                .into());
            }

            track.seat(PlayerSnapshot {
                id: user.id.clone(),
                name: user.name.clone(),
                lane,
                fuel: mix.clone(),
            })?;

            match self.tracks.save(&track).await? {
                SaveOutcome::Saved(saved) => {
                    debug!(track_id = %track_id, user_id = %user.id, seats = saved.num_players, "Player seated");
                    return Ok(saved);
                }
                SaveOutcome::Stale => {
                    debug!(track_id = %track_id, attempt, "Seat write lost a race, retrying");
                }
            }
        }
        Err(RaceError::not_joinable(track_id, "track is too contended, try again").into())
    }

    /// Store the portfolio of a seated user.
    ///
    /// # Errors
    ///
    /// [`RaceError::TrackNotFound`] if the track does not exist and
    /// [`RaceError::PortfolioAlreadySet`] if the user already has one.
    pub async fn set_portfolio(
        &self,
        track_id: &TrackId,
        user_id: &UserId,
        mix: AssetMix,
    ) -> Result<Portfolio> {
        self.get(track_id).await?;
        let portfolio = Portfolio::new(track_id.clone(), user_id.clone(), mix);
        if !self.portfolios.insert(&portfolio).await? {
            return Err(RaceError::PortfolioAlreadySet {
                track_id: track_id.clone(),
                user_id: user_id.clone(),
            }
            .into());
        }
        Ok(portfolio)
    }

    /// Activate the track if every seat is taken and every player has a
    /// portfolio.
    ///
    /// # Errors
    ///
    /// [`RaceError::TrackNotFound`] or storage errors.
    pub async fn try_activate(&self, track_id: &TrackId) -> Result<Activation> {
        for attempt in 1..=self.retry_limit {
            let mut track = self.get(track_id).await?;
            match track.status {
                TrackStatus::Awaiting => {}
                TrackStatus::Active | TrackStatus::Finished => {
                    return Ok(Activation::AlreadyActive(track));
                }
                TrackStatus::Cancelled => return Ok(Activation::NotReady(track)),
            }
            if !track.is_full() || !self.all_portfolios_set(&track).await? {
                return Ok(Activation::NotReady(track));
            }

            track.activate(self.clock.now())?;
            match self.tracks.save(&track).await? {
                SaveOutcome::Saved(saved) => {
                    info!(track_id = %track_id, start = saved.start, end = saved.end, "Track activated");
                    return Ok(Activation::Activated(saved));
                }
                SaveOutcome::Stale => {
                    debug!(track_id = %track_id, attempt, "Activation write lost a race, re-checking");
                }
            }
        }
        // Still contended: someone else is writing, and re-reading will tell.
        let track = self.get(track_id).await?;
        Ok(match track.status {
            TrackStatus::Awaiting | TrackStatus::Cancelled => Activation::NotReady(track),
            _ => Activation::AlreadyActive(track),
        })
    }

    async fn all_portfolios_set(&self, track: &Track) -> Result<bool> {
        let portfolios = self.portfolios.list_for_track(&track.id).await?;
        Ok(track
            .users
            .iter()
            .all(|u| portfolios.iter().filter(|p| &p.user_id == u).count() == 1))
    }

    /// Attach final standings and move the track to FINISHED.
    ///
    /// # Errors
    ///
    /// [`RaceError::TrackNotActive`] when the track is still awaiting.
    pub async fn finish(&self, track_id: &TrackId, winners: Vec<FinalStanding>) -> Result<Finish> {
        for attempt in 1..=self.retry_limit {
            let mut track = self.get(track_id).await?;
            if track.status == TrackStatus::Finished {
                return Ok(Finish::AlreadyFinished);
            }
            track.finish(winners.clone())?;
            match self.tracks.save(&track).await? {
                SaveOutcome::Saved(saved) => {
                    info!(track_id = %track_id, "Track finished");
                    return Ok(Finish::Finished(saved));
                }
                SaveOutcome::Stale => {
                    debug!(track_id = %track_id, attempt, "Finish write lost a race, re-checking");
                }
            }
        }
        match self.get(track_id).await?.status {
            TrackStatus::Finished => Ok(Finish::AlreadyFinished),
            _ => Err(RaceError::TrackNotActive(track_id.clone()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryStore;
    use crate::adapter::outbound::clock::TokioClock;
    use crate::error::Error;
    use crate::testkit::domain::{mix, user};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    /// Portfolio store whose writes always fail.
    struct BrokenPortfolios(Arc<MemoryStore>);

    #[async_trait]
    impl PortfolioStore for BrokenPortfolios {
        async fn insert(&self, _portfolio: &Portfolio) -> Result<bool> {
            Err(Error::Database("disk I/O error".into()))
        }

        async fn get(&self, track_id: &TrackId, user_id: &UserId) -> Result<Option<Portfolio>> {
            PortfolioStore::get(self.0.as_ref(), track_id, user_id).await
        }

        async fn list_for_track(&self, track_id: &TrackId) -> Result<Vec<Portfolio>> {
            self.0.list_for_track(track_id).await
        }
    }

    fn machine() -> (RaceMachine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let m = RaceMachine::new(
            Arc::clone(&store) as Arc<dyn TrackStore>,
            Arc::clone(&store) as Arc<dyn PortfolioStore>,
            Arc::new(TokioClock::new(1_700_000_002)),
            5,
        );
        (m, store)
    }

    async fn new_track(m: &RaceMachine, seats: usize) -> Track {
        m.create(dec!(1000), seats, 300, TrackKind::User, None).await.unwrap()
    }

    fn race_err(e: crate::error::Error) -> RaceError {
        e.as_race().cloned().expect("race error")
    }

    #[tokio::test]
    async fn create_rejects_zero_seats() {
        let (m, _) = machine();
        let err = m.create(dec!(1), 0, 300, TrackKind::User, None).await.unwrap_err();
        assert!(matches!(race_err(err), RaceError::InvalidTrack(_)));
    }

    #[tokio::test]
    async fn join_seats_player_and_stores_portfolio() {
        let (m, store) = machine();
        let t = new_track(&m, 2).await;

        let joined = m.join(&user("u1"), &t.id, mix(40, 60), 1).await.unwrap();
        assert_eq!(joined.num_players, 1);
        assert_eq!(joined.lane_of(&UserId::new("u1")), Some(1));
        assert!(PortfolioStore::get(store.as_ref(), &t.id, &UserId::new("u1"))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn join_rejects_member_of_another_awaiting_track() {
        let (m, _) = machine();
        let a = new_track(&m, 2).await;
        let b = new_track(&m, 2).await;

        m.join(&user("u1"), &a.id, mix(50, 50), 0).await.unwrap();
        let err = m.join(&user("u1"), &b.id, mix(50, 50), 0).await.unwrap_err();
        assert!(matches!(race_err(err), RaceError::TrackNotJoinable { .. }));
    }

    #[tokio::test]
    async fn join_unknown_track_is_not_found() {
        let (m, _) = machine();
        let err = m
            .join(&user("u1"), &TrackId::from("nope"), mix(50, 50), 0)
            .await
            .unwrap_err();
        assert!(matches!(race_err(err), RaceError::TrackNotFound(_)));
    }

    #[tokio::test]
    async fn portfolio_cannot_be_set_twice() {
        let (m, _) = machine();
        let t = new_track(&m, 2).await;
        m.set_portfolio(&t.id, &UserId::new("u1"), mix(50, 50)).await.unwrap();
        let err = m
            .set_portfolio(&t.id, &UserId::new("u1"), mix(10, 90))
            .await
            .unwrap_err();
        assert!(matches!(race_err(err), RaceError::PortfolioAlreadySet { .. }));
    }

    #[tokio::test]
    async fn activation_requires_full_track() {
        let (m, _) = machine();
        let t = new_track(&m, 2).await;
        m.join(&user("u1"), &t.id, mix(50, 50), 0).await.unwrap();
        assert!(matches!(m.try_activate(&t.id).await.unwrap(), Activation::NotReady(_)));
    }

    #[tokio::test]
    async fn activation_happens_once() {
        let (m, _) = machine();
        let t = new_track(&m, 2).await;
        m.join(&user("u1"), &t.id, mix(50, 50), 0).await.unwrap();
        m.join(&user("u2"), &t.id, mix(50, 50), 1).await.unwrap();

        let first = m.try_activate(&t.id).await.unwrap();
        let Activation::Activated(active) = first else {
            panic!("expected activation, got {first:?}");
        };
        assert_eq!(active.start, 1_700_000_005);
        assert_eq!(active.end, active.start + 300);

        assert!(matches!(
            m.try_activate(&t.id).await.unwrap(),
            Activation::AlreadyActive(_)
        ));
    }

    #[tokio::test]
    async fn join_on_active_track_is_rejected() {
        let (m, _) = machine();
        let t = new_track(&m, 1).await;
        m.join(&user("u1"), &t.id, mix(50, 50), 0).await.unwrap();
        m.try_activate(&t.id).await.unwrap();

        let err = m.join(&user("u2"), &t.id, mix(50, 50), 0).await.unwrap_err();
        assert!(matches!(race_err(err), RaceError::TrackNotJoinable { .. }));
    }

    #[tokio::test]
    async fn concurrent_joins_never_exceed_seats() {
        let (m, store) = machine();
        let m = Arc::new(m);
        let t = new_track(&m, 3).await;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let m = Arc::clone(&m);
                let id = t.id.clone();
                tokio::spawn(async move { m.join(&user(&format!("u{i}")), &id, mix(50, 50), 0).await })
            })
            .collect();
        for h in handles {
            let _ = h.await.unwrap();
        }

        let stored = TrackStore::get(store.as_ref(), &t.id).await.unwrap().unwrap();
        assert_eq!(stored.num_players, 3);
        assert_eq!(stored.users.len(), 3);
    }

    #[tokio::test]
    async fn finish_is_guarded_by_status() {
        let (m, _) = machine();
        let t = new_track(&m, 1).await;
        let err = m.finish(&t.id, vec![]).await.unwrap_err();
        assert!(matches!(race_err(err), RaceError::TrackNotActive(_)));

        m.join(&user("u1"), &t.id, mix(50, 50), 0).await.unwrap();
        m.try_activate(&t.id).await.unwrap();
        assert!(matches!(m.finish(&t.id, vec![]).await.unwrap(), Finish::Finished(_)));
        assert_eq!(m.finish(&t.id, vec![]).await.unwrap(), Finish::AlreadyFinished);
    }

    #[tokio::test]
    async fn failed_portfolio_write_gives_the_seat_back() {
        let store = Arc::new(MemoryStore::new());
        let m = RaceMachine::new(
            Arc::clone(&store) as Arc<dyn TrackStore>,
            Arc::new(BrokenPortfolios(Arc::clone(&store))),
            Arc::new(TokioClock::new(1_700_000_002)),
            5,
        );
        let t = new_track(&m, 1).await;

        let err = m.join(&user("u1"), &t.id, mix(50, 50), 0).await.unwrap_err();
        assert!(matches!(err, Error::Database(_)));

        let stored = TrackStore::get(store.as_ref(), &t.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TrackStatus::Awaiting);
        assert_eq!(stored.num_players, 0);
        assert!(stored.users.is_empty());
        assert!(stored.players.is_empty());
        assert!(store.find_awaiting_with_member(&UserId::new("u1")).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_of_one_user_seat_them_once() {
        for _ in 0..20 {
            let (m, store) = machine();
            let m = Arc::new(m);
            let a = new_track(&m, 2).await;
            let b = new_track(&m, 2).await;

            let handles: Vec<_> = [a.id.clone(), b.id.clone()]
                .into_iter()
                .map(|id| {
                    let m = Arc::clone(&m);
                    tokio::spawn(async move { m.join(&user("u1"), &id, mix(50, 50), 0).await })
                })
                .collect();
            let mut joined = 0;
            for h in handles {
                if h.await.unwrap().is_ok() {
                    joined += 1;
                }
            }
            assert_eq!(joined, 1);

            let mut seated = 0;
            for id in [&a.id, &b.id] {
                let t = TrackStore::get(store.as_ref(), id).await.unwrap().unwrap();
                if t.has_member(&UserId::new("u1")) {
                    seated += 1;
                }
            }
            assert_eq!(seated, 1);
        }
    }
}
