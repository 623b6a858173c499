//! Infrastructure bootstrap helpers for runtime wiring.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::adapter::outbound::chain::DryRunChain;
use crate::adapter::outbound::clock::SystemClock;
use crate::adapter::outbound::memory::MemoryStore;
use crate::adapter::outbound::rates::{MemoryRateCache, RatePoller};
use crate::adapter::outbound::sqlite::database::connection::{create_pool, run_migrations};
use crate::adapter::outbound::sqlite::SqliteStore;
use crate::adapter::outbound::transport::BroadcastSink;
use crate::application::race::{RaceCoordinator, RacePorts};
use crate::application::scheduler::{JobQueue, JobScheduler};
use crate::error::Result;
use crate::infrastructure::config::chain::ChainMode;
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::config::storage::StorageConfig;
use crate::port::{ChainClient, Clock, PortfolioStore, TrackStore, UserDirectory};

/// Track and portfolio persistence chosen by `[storage]`.
pub(crate) struct Stores {
    pub tracks: Arc<dyn TrackStore>,
    pub portfolios: Arc<dyn PortfolioStore>,
}

/// Everything the runtime needs, fully wired.
pub struct Engine {
    pub coordinator: Arc<RaceCoordinator>,
    pub queue: JobQueue,
    pub events: BroadcastSink,
    pub rates: Arc<MemoryRateCache>,
    pub clock: Arc<dyn Clock>,
}

pub(crate) fn build_stores(config: &Config) -> Result<Stores> {
    match &config.storage {
        StorageConfig::Memory => {
            let store = Arc::new(MemoryStore::new());
            info!("Using in-memory storage");
            Ok(Stores {
                tracks: Arc::clone(&store) as Arc<dyn TrackStore>,
                portfolios: store,
            })
        }
        StorageConfig::Sqlite { path } => {
            let pool = create_pool(path)?;
            run_migrations(&pool)?;
            let store = Arc::new(SqliteStore::new(pool));
            info!(database = %path, "Database initialized");
            Ok(Stores {
                tracks: Arc::clone(&store) as Arc<dyn TrackStore>,
                portfolios: store,
            })
        }
    }
}

/// Bot accounts from `[[bots]]`. Users themselves are authenticated
/// upstream; only bots need to be resolvable here.
pub(crate) fn build_directory(config: &Config) -> Arc<dyn UserDirectory> {
    let directory = MemoryStore::new();
    for bot in &config.bots {
        directory.add_bot(bot.to_user());
    }
    info!(bots = config.bots.len(), "Bot directory loaded");
    Arc::new(directory)
}

#[allow(clippy::result_large_err)]
pub(crate) fn build_chain(config: &Config) -> Result<Arc<dyn ChainClient>> {
    match config.chain.mode {
        ChainMode::DryRun => {
            info!("Chain calls run in dry-run mode");
            Ok(Arc::new(DryRunChain::new()))
        }
        #[cfg(feature = "evm")]
        ChainMode::Evm => {
            let client = crate::adapter::outbound::chain::EvmChainClient::new(
                &config.chain.rpc_url,
                config.chain.chain_id,
                &config.chain.contract_address,
                config.chain.rates_contract(),
            )?;
            info!(rpc = %config.chain.rpc_url, chain_id = config.chain.chain_id, "EVM chain client ready");
            Ok(Arc::new(client))
        }
        #[cfg(not(feature = "evm"))]
        ChainMode::Evm => Err(crate::error::ConfigError::InvalidValue {
            field: "mode",
            reason: "evm mode requires the `evm` feature".to_string(),
        }
        .into()),
    }
}

/// Wire stores, chain, rates, events and the scheduler into a coordinator.
///
/// # Errors
///
/// Storage initialization failures and an unavailable chain mode.
pub fn build_engine(config: &Config) -> Result<Engine> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let stores = build_stores(config)?;
    let chain = build_chain(config)?;
    let rates = Arc::new(MemoryRateCache::new(config.rates.ttl_secs));
    let events = BroadcastSink::default();

    let (scheduler, queue) = JobScheduler::new(Arc::clone(&clock));
    let ports = RacePorts {
        tracks: stores.tracks,
        portfolios: stores.portfolios,
        users: build_directory(config),
        rates: rates.clone(),
        chain,
        events: Arc::new(events.clone()),
        clock: Arc::clone(&clock),
    };
    let coordinator = Arc::new(RaceCoordinator::new(
        ports,
        config.chain.owner(),
        scheduler,
        config.race.settings(),
    ));

    Ok(Engine {
        coordinator,
        queue,
        events,
        rates,
        clock,
    })
}

/// Build the rate poller if `[rates]` enables it.
#[must_use]
pub fn build_poller(config: &Config, engine: &Engine) -> Option<RatePoller> {
    config.rates.enabled.then(|| {
        RatePoller::new(
            &config.rates.source_url,
            Duration::from_secs(config.rates.poll_interval_secs),
            Arc::clone(&engine.rates),
            Arc::clone(&engine.clock),
        )
    })
}
