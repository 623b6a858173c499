//! A race coordinator wired to in-memory adapters.
//!
//! Uses [`TokioClock`] so tests running on a paused runtime control both the
//! scheduler's timers and the coordinator's notion of "now".

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::chain::FakeChain;
use super::domain::{bot, user};
use super::events::RecordingSink;
use crate::adapter::outbound::clock::TokioClock;
use crate::adapter::outbound::memory::MemoryStore;
use crate::adapter::outbound::rates::MemoryRateCache;
use crate::application::race::{RaceCoordinator, RacePorts, RaceSettings};
use crate::application::scheduler::{JobHandler, JobQueue, JobScheduler};
use crate::domain::{ChainAccount, KeyRef, RateSnapshot, User};
use crate::port::PortfolioStore;

/// Epoch second the test clock starts at. Aligned to a bucket boundary.
pub const ORIGIN: i64 = 1_700_000_000;

pub struct TestRace {
    pub coordinator: Arc<RaceCoordinator>,
    pub store: Arc<MemoryStore>,
    pub rates: Arc<MemoryRateCache>,
    pub chain: Arc<FakeChain>,
    pub events: Arc<RecordingSink>,
    pub clock: TokioClock,
    queue: Option<JobQueue>,
}

impl TestRace {
    /// A coordinator with `bots` bot accounts registered.
    pub fn new(settings: RaceSettings, bots: usize) -> Self {
        Self::with_portfolios(settings, bots, |store| store)
    }

    /// Like [`new`](Self::new), but portfolios go through the store returned
    /// by `portfolios`, which is handed the shared in-memory store.
    pub fn with_portfolios(
        settings: RaceSettings,
        bots: usize,
        portfolios: impl FnOnce(Arc<MemoryStore>) -> Arc<dyn PortfolioStore>,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        for i in 0..bots {
            store.add_bot(bot(&format!("bot{i}")));
        }
        let rates = Arc::new(MemoryRateCache::default());
        let chain = Arc::new(FakeChain::new());
        let events = Arc::new(RecordingSink::new());
        let clock = TokioClock::new(ORIGIN);

        let (scheduler, queue) = JobScheduler::new(Arc::new(clock));
        let ports = RacePorts {
            tracks: store.clone(),
            portfolios: portfolios(store.clone()),
            users: store.clone(),
            rates: rates.clone(),
            chain: chain.clone(),
            events: events.clone(),
            clock: Arc::new(clock),
        };
        let coordinator = Arc::new(RaceCoordinator::new(ports, owner(), scheduler, settings));

        Self {
            coordinator,
            store,
            rates,
            chain,
            events,
            clock,
            queue: Some(queue),
        }
    }

    /// A registered human user.
    pub fn user(&self, id: &str) -> User {
        let u = user(id);
        self.store.add_user(u.clone());
        u
    }

    /// Store `rates` under `bucket`.
    pub fn price(&self, bucket: i64, rates: RateSnapshot) {
        self.rates.insert(bucket, rates);
    }

    /// Start dispatching fired jobs to the coordinator. Only the first call
    /// spawns a worker.
    pub fn start_worker(&mut self, shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        let queue = self.queue.take()?;
        let handler = Arc::clone(&self.coordinator) as Arc<dyn JobHandler>;
        Some(tokio::spawn(queue.run(handler, shutdown)))
    }

    /// Take the queue to drive jobs by hand.
    pub fn take_queue(&mut self) -> Option<JobQueue> {
        self.queue.take()
    }
}

/// The backend owner account used by [`TestRace`].
pub fn owner() -> ChainAccount {
    ChainAccount::new("0xowner", KeyRef::new("owner-key"))
}
