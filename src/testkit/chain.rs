//! Scriptable chain client.

use std::collections::VecDeque;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::domain::Address;
use crate::error::ChainError;
use crate::port::{ChainClient, TransactionRequest, TxHash};

/// In-memory chain with a pending-nonce counter per account.
///
/// Accepted transactions advance the counter; a nonce below it is refused
/// with [`ChainError::NonceTooLow`]. Failures queued with
/// [`fail_next`](Self::fail_next) are returned before any other check.
#[derive(Default)]
pub struct FakeChain {
    pending: DashMap<Address, u64>,
    failures: Mutex<VecDeque<ChainError>>,
    submitted: Mutex<Vec<TransactionRequest>>,
}

impl FakeChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `address` already has `nonce` transactions on chain.
    pub fn set_pending(&self, address: &Address, nonce: u64) {
        self.pending.insert(address.clone(), nonce);
    }

    /// Make the next `submit` fail with `error`.
    pub fn fail_next(&self, error: ChainError) {
        self.failures.lock().push_back(error);
    }

    /// Accepted transactions, in submission order.
    #[must_use]
    pub fn submitted(&self) -> Vec<TransactionRequest> {
        self.submitted.lock().clone()
    }

    /// Accepted calls by contract method name.
    #[must_use]
    pub fn methods(&self) -> Vec<&'static str> {
        self.submitted.lock().iter().map(|tx| tx.call.method()).collect()
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn pending_nonce(&self, address: &Address) -> Result<u64, ChainError> {
        Ok(self.pending.get(address).map_or(0, |n| *n))
    }

    async fn submit(&self, tx: TransactionRequest) -> Result<TxHash, ChainError> {
        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }
        let mut pending = self.pending.entry(tx.from.address.clone()).or_insert(0);
        if tx.nonce < *pending {
            return Err(ChainError::NonceTooLow(format!(
                "nonce {} below {}",
                tx.nonce, *pending
            )));
        }
        *pending = tx.nonce + 1;
        drop(pending);

        let mut submitted = self.submitted.lock();
        let hash = TxHash::new(format!("0x{:064x}", submitted.len()));
        submitted.push(tx);
        Ok(hash)
    }
}
