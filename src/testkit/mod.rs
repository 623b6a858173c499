//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`chain`] - [`FakeChain`](chain::FakeChain), a scriptable chain client.
//! - [`events`] - [`RecordingSink`](events::RecordingSink), an event sink
//!   that keeps everything it is given.
//! - [`domain`] - Builders for users, asset mixes, players and rate snapshots.
//! - [`config`] - Canonical test configurations.
//! - [`race`] - A fully wired coordinator on in-memory adapters.

pub mod chain;
pub mod config;
pub mod domain;
pub mod events;
pub mod race;
