//! Chain client adapters.
//!
//! [`DryRunChain`] is always available and is what the binary uses unless
//! the `evm` feature is enabled and configured.

mod dry_run;
#[cfg(feature = "evm")]
mod evm;

pub use dry_run::DryRunChain;
#[cfg(feature = "evm")]
pub use evm::EvmChainClient;
