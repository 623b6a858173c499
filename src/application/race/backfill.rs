//! Bot backfill for tracks that did not fill with humans.

use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::domain::{AssetMix, Track, TrackId, TrackStatus, User};
use crate::error::{Error, RaceError, Result};
use crate::port::{TrackStore, UserDirectory};

/// Fuel split handed to bots, shuffled per join.
const BOT_FUEL: [u32; 5] = [10, 20, 30, 40, 0];

/// Number of lanes a bot may pick from.
const LANES: u8 = 4;

/// The entry point a joining player goes through.
///
/// Bots use exactly the same path as humans so the state machine's checks
/// and the start scheduling apply to them too.
#[async_trait]
pub trait RaceEntry: Send + Sync {
    async fn enter(&self, user: &User, track_id: &TrackId, mix: AssetMix, lane: u8) -> Result<Track>;
}

/// Read-through cache of the reserved bot accounts.
///
/// Loaded from the directory on first use and shared afterwards.
pub struct BotPool {
    directory: Arc<dyn UserDirectory>,
    bots: OnceCell<Arc<[User]>>,
}

impl BotPool {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            directory,
            bots: OnceCell::new(),
        }
    }

    /// # Errors
    ///
    /// Propagates a directory failure; the next call tries again.
    pub async fn get(&self) -> Result<Arc<[User]>> {
        let bots = self
            .bots
            .get_or_try_init(|| async {
                let bots = self.directory.bots().await?;
                info!(count = bots.len(), "Bot pool loaded");
                Ok::<_, Error>(Arc::from(bots))
            })
            .await?;
        Ok(Arc::clone(bots))
    }
}

pub struct BotBackfill {
    pool: BotPool,
    tracks: Arc<dyn TrackStore>,
}

impl BotBackfill {
    pub fn new(pool: BotPool, tracks: Arc<dyn TrackStore>) -> Self {
        Self { pool, tracks }
    }

    /// Seat bots on `track_id` until it is full or leaves AWAITING.
    ///
    /// Returns the number of bots that joined. A bot whose join is rejected
    /// is skipped and the next one is tried.
    ///
    /// # Errors
    ///
    /// Storage failures and a bot pool that cannot be loaded.
    pub async fn fill(&self, track_id: &TrackId, entry: &dyn RaceEntry) -> Result<usize> {
        let Some(mut track) = self.tracks.get(track_id).await? else {
            warn!(track_id = %track_id, "Backfill target vanished");
            return Ok(0);
        };
        let deficit = track.max_players.saturating_sub(track.num_players);
        debug!(track_id = %track_id, deficit, "Backfilling track");

        let bots = self.pool.get().await?;
        let mut joined = 0;
        for bot in bots.iter() {
            if track.status != TrackStatus::Awaiting || track.is_full() {
                break;
            }
            if track.has_member(&bot.id) {
                continue;
            }
            if self.tracks.find_awaiting_with_member(&bot.id).await?.is_some() {
                debug!(track_id = %track_id, bot = %bot.id, "Bot busy in another track");
                continue;
            }

            let (mix, lane) = {
                let mut rng = rand::thread_rng();
                let mut fuel = BOT_FUEL;
                fuel.shuffle(&mut rng);
                (AssetMix::from_fuel(&fuel, &mut rng), rng.gen_range(0..LANES))
            };
            let mix = mix.map_err(RaceError::from)?;

            match entry.enter(bot, track_id, mix, lane).await {
                Ok(updated) => {
                    joined += 1;
                    track = updated;
                }
                Err(e) if e.as_race().is_some() => {
                    warn!(track_id = %track_id, bot = %bot.id, error = %e, "Bot join rejected");
                    match self.tracks.get(track_id).await? {
                        Some(t) => track = t,
                        None => break,
                    }
                }
                Err(e) => return Err(e),
            }
        }

        if joined < deficit && track.status == TrackStatus::Awaiting && !track.is_full() {
            warn!(track_id = %track_id, joined, deficit, "Bot pool exhausted before track filled");
        }
        info!(track_id = %track_id, joined, "Backfill complete");
        Ok(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryStore;
    use crate::domain::{TrackKind, UserId};
    use crate::testkit::domain::{player, user};
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;

    /// Seats directly on the store, like the coordinator would.
    struct DirectEntry {
        store: Arc<MemoryStore>,
        entered: Mutex<Vec<UserId>>,
    }

    #[async_trait]
    impl RaceEntry for DirectEntry {
        async fn enter(&self, user: &User, track_id: &TrackId, mix: AssetMix, lane: u8) -> Result<Track> {
            let mut t = TrackStore::get(self.store.as_ref(), track_id).await?.unwrap();
            t.seat(crate::domain::PlayerSnapshot {
                id: user.id.clone(),
                name: user.name.clone(),
                lane,
                fuel: mix,
            })?;
            let crate::port::SaveOutcome::Saved(saved) = TrackStore::save(self.store.as_ref(), &t).await? else {
                panic!("unexpected stale write");
            };
            self.entered.lock().push(user.id.clone());
            Ok(saved)
        }
    }

    fn setup(bots: usize) -> (Arc<MemoryStore>, BotBackfill, DirectEntry) {
        let store = Arc::new(MemoryStore::new());
        for i in 0..bots {
            store.add_bot(user(&format!("bot{i}")));
        }
        let backfill = BotBackfill::new(
            BotPool::new(Arc::clone(&store) as Arc<dyn UserDirectory>),
            Arc::clone(&store) as Arc<dyn TrackStore>,
        );
        let entry = DirectEntry {
            store: Arc::clone(&store),
            entered: Mutex::new(Vec::new()),
        };
        (store, backfill, entry)
    }

    async fn track_with(store: &MemoryStore, seats: usize, humans: &[&str]) -> Track {
        let mut t = Track::new(dec!(1), seats, 300, TrackKind::Backend, None, 0);
        for (i, h) in humans.iter().enumerate() {
            t.seat(player(h, i as u8, crate::testkit::domain::mix(50, 50))).unwrap();
        }
        TrackStore::insert(store, &t).await.unwrap();
        t
    }

    #[tokio::test]
    async fn fills_exactly_the_deficit() {
        let (store, backfill, entry) = setup(5);
        let t = track_with(&store, 4, &["human"]).await;

        let joined = backfill.fill(&t.id, &entry).await.unwrap();
        assert_eq!(joined, 3);
        let stored = TrackStore::get(store.as_ref(), &t.id).await.unwrap().unwrap();
        assert_eq!(stored.num_players, 4);
    }

    #[tokio::test]
    async fn skips_bots_waiting_elsewhere() {
        let (store, backfill, entry) = setup(3);
        track_with(&store, 4, &["bot0"]).await;
        let t = track_with(&store, 3, &["human"]).await;

        backfill.fill(&t.id, &entry).await.unwrap();
        let entered = entry.entered.lock().clone();
        assert_eq!(entered, [UserId::new("bot1"), UserId::new("bot2")]);
    }

    #[tokio::test]
    async fn full_track_gets_no_bots() {
        let (store, backfill, entry) = setup(3);
        let t = track_with(&store, 1, &["human"]).await;
        assert_eq!(backfill.fill(&t.id, &entry).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn pool_is_loaded_once() {
        let (store, backfill, _) = setup(2);
        let first = backfill.pool.get().await.unwrap();
        store.add_bot(user("late"));
        let second = backfill.pool.get().await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
    }
}
