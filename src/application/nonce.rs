//! Per-account nonce sequencing.
//!
//! Every on-chain call goes through a [`NonceLease`]. Holding a lease
//! holds the account's lock, so calls from one account are serialized
//! through reserve, submit and commit while other accounts proceed in
//! parallel.
//!
//! The reserved nonce is `max(cached watermark, chain pending count)`,
//! which keeps the sequencer correct after a restart or when another
//! process signs with the same key.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::domain::Address;
use crate::error::ChainError;
use crate::port::ChainClient;

type Watermark = Arc<Mutex<Option<u64>>>;

/// Hands out nonces per address.
pub struct NonceSequencer {
    chain: Arc<dyn ChainClient>,
    watermarks: DashMap<Address, Watermark>,
}

impl NonceSequencer {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self {
            chain,
            watermarks: DashMap::new(),
        }
    }

    /// Reserve the next nonce for `address`.
    ///
    /// Waits for any outstanding lease on the same address to be dropped.
    ///
    /// # Errors
    ///
    /// Propagates the chain error if the pending count cannot be read.
    pub async fn reserve(&self, address: &Address) -> Result<NonceLease, ChainError> {
        let cell = self
            .watermarks
            .entry(address.clone())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();
        let mut guard = cell.lock_owned().await;

        let on_chain = self.chain.pending_nonce(address).await?;
        let nonce = (*guard).map_or(on_chain, |cached| cached.max(on_chain));
        *guard = Some(nonce);

        debug!(address = %address, nonce, on_chain, "Nonce reserved");
        Ok(NonceLease {
            guard,
            address: address.clone(),
            nonce,
        })
    }

    /// Cached watermark for `address`, if one has been seeded.
    pub async fn watermark(&self, address: &Address) -> Option<u64> {
        let cell = self.watermarks.get(address).map(|c| Arc::clone(c.value()))?;
        let value = *cell.lock().await;
        value
    }
}

/// An exclusive reservation of one nonce.
///
/// Call [`commit`](Self::commit) once the chain has returned a hash.
/// Dropping the lease without committing leaves the watermark where it was.
#[must_use = "a lease that is dropped without commit releases its nonce"]
pub struct NonceLease {
    guard: OwnedMutexGuard<Option<u64>>,
    address: Address,
    nonce: u64,
}

impl NonceLease {
    #[must_use]
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Advance the watermark past the reserved nonce.
    pub fn commit(mut self) {
        *self.guard = Some(self.nonce + 1);
    }

    /// Forget the cached watermark so the next reservation re-reads the chain.
    pub fn invalidate(mut self) {
        warn!(address = %self.address, nonce = self.nonce, "Nonce watermark invalidated");
        *self.guard = None;
    }
}
