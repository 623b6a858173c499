//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the engine's infrastructure dependencies:
//! persistence, the rate cache, the chain client, real-time delivery and
//! the wall clock.

pub mod chain;
pub mod clock;
pub mod rates;
pub mod store;
pub mod transport;
