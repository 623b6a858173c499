//! Racetrack - timed multiplayer portfolio races.
//!
//! Players join a track with a split of "fuel" across crypto assets. When the
//! track is full the race runs for a fixed duration, and at the end players
//! are ranked by how much their weighted basket gained in USD terms. Every
//! transition is mirrored on an EVM race contract.
//!
//! # Architecture
//!
//! - **`domain`** - Tracks, asset mixes, scoring. Pure and synchronous.
//! - **`port`** - Traits the engine depends on (storage, rates, chain, events)
//!   and the inbound [`RaceApi`](port::RaceApi).
//! - **`application`** - Race state machine, job scheduler, bot backfill,
//!   nonce sequencing and the [`RaceCoordinator`](application::race::RaceCoordinator).
//! - **`adapter`** - In-memory and SQLite storage, rate feed, chain clients,
//!   broadcast event sink.
//! - **`infrastructure`** - Configuration, wiring and the runtime loop.
//!
//! # Features
//!
//! - `evm` - Sign and broadcast race calls with alloy instead of the dry-run client.
//! - `testkit` - Export [`testkit`] for integration tests.
//!
//! # Example
//!
//! ```no_run
//! use racetrack::infrastructure::config::Config;
//! use racetrack::infrastructure::runtime;
//!
//! # async fn demo() -> racetrack::error::Result<()> {
//! let config = Config::load("config.toml")?;
//! config.init_logging();
//! runtime::run(config).await
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod cli;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
