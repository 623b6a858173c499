//! Infrastructure configuration modules.

pub mod bots;
pub mod chain;
pub mod logging;
pub mod race;
pub mod rates;
pub mod settings;
pub mod storage;

pub use settings::Config;
