//! Race lifecycle use cases.
//!
//! - [`machine`]: persisted track transitions with compare-and-swap
//! - [`scoreboard`]: standings from portfolios and cached rates
//! - [`backfill`]: bot pool and backfill of stalled tracks
//! - [`coordinator`]: the orchestrator behind [`RaceApi`](crate::port::RaceApi)

pub mod backfill;
pub mod coordinator;
pub mod machine;
pub mod scoreboard;
pub mod settings;

pub use backfill::{BotBackfill, BotPool, RaceEntry};
pub use coordinator::{RaceCoordinator, RacePorts, Recovery};
pub use machine::{Activation, Finish, RaceMachine};
pub use scoreboard::{final_standings, Scoreboard, Scored};
pub use settings::RaceSettings;
