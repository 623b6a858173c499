//! Application services (use cases).
//!
//! These services orchestrate domain logic and coordinate adapters
//! to run races from formation to settlement.

pub mod chain;
pub mod nonce;
pub mod race;
pub mod scheduler;
