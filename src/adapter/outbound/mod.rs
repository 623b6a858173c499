//! Outbound adapters (driven side).

pub mod chain;
pub mod clock;
pub mod memory;
pub mod rates;
pub mod sqlite;
pub mod transport;
