//! Chain client that signs nothing and broadcasts nothing.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::info;

use crate::domain::Address;
use crate::error::ChainError;
use crate::port::{ChainClient, TransactionRequest, TxHash};

/// Logs each call and keeps a local nonce counter per account.
///
/// Behaves like a node that accepts every transaction: a nonce below the
/// account's counter is refused with [`ChainError::NonceTooLow`], anything
/// else is accepted and advances the counter.
#[derive(Debug, Default)]
pub struct DryRunChain {
    pending: DashMap<Address, u64>,
}

impl DryRunChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChainClient for DryRunChain {
    async fn pending_nonce(&self, address: &Address) -> Result<u64, ChainError> {
        Ok(self.pending.get(address).map_or(0, |n| *n))
    }

    async fn submit(&self, tx: TransactionRequest) -> Result<TxHash, ChainError> {
        let mut pending = self.pending.entry(tx.from.address.clone()).or_insert(0);
        if tx.nonce < *pending {
            return Err(ChainError::NonceTooLow(format!(
                "nonce {} below pending {}",
                tx.nonce, *pending
            )));
        }
        *pending = tx.nonce + 1;
        drop(pending);

        let hash = TxHash::new(format!(
            "0x{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        ));
        info!(
            method = tx.call.method(),
            from = %tx.from.address,
            nonce = tx.nonce,
            tx = %hash,
            "[dry-run] transaction"
        );
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChainAccount, KeyRef, TrackId};
    use crate::port::RaceCall;

    fn request(nonce: u64) -> TransactionRequest {
        TransactionRequest {
            from: ChainAccount::new("0xOwner", KeyRef::new("k")),
            nonce,
            call: RaceCall::StartTrack {
                track_id: TrackId::from("t"),
                start: 0,
            },
        }
    }

    #[tokio::test]
    async fn accepted_nonce_advances_pending() {
        let chain = DryRunChain::new();
        let hash = chain.submit(request(0)).await.unwrap();
        assert_eq!(hash.as_str().len(), 66);
        assert_eq!(chain.pending_nonce(&Address::new("0xowner")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reused_nonce_is_too_low() {
        let chain = DryRunChain::new();
        chain.submit(request(0)).await.unwrap();
        let err = chain.submit(request(0)).await.unwrap_err();
        assert!(matches!(err, ChainError::NonceTooLow(_)));
    }
}
