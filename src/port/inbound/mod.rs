//! Inbound (driving) ports consumed by inbound adapters.
//!
//! - [`race`]: race operations called by the socket/HTTP layer

pub mod race;
