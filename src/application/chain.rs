//! Sequenced access to the race contract.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::nonce::NonceSequencer;
use crate::domain::ChainAccount;
use crate::error::{ChainError, RaceError};
use crate::port::{ChainClient, RaceCall, TransactionRequest, TxHash};

/// Wraps a [`ChainClient`] so every submission takes a nonce lease first.
pub struct ChainGateway {
    chain: Arc<dyn ChainClient>,
    nonces: NonceSequencer,
    owner: ChainAccount,
}

impl ChainGateway {
    /// `owner` signs backend calls (track seeding, start, rates).
    pub fn new(chain: Arc<dyn ChainClient>, owner: ChainAccount) -> Self {
        Self {
            nonces: NonceSequencer::new(Arc::clone(&chain)),
            chain,
            owner,
        }
    }

    #[must_use]
    pub fn owner(&self) -> &ChainAccount {
        &self.owner
    }

    #[must_use]
    pub fn nonces(&self) -> &NonceSequencer {
        &self.nonces
    }

    /// Submit `call` signed by `from`.
    ///
    /// # Errors
    ///
    /// [`RaceError::NonceConflict`] if the chain already saw the nonce,
    /// otherwise [`RaceError::ChainSubmissionFailed`].
    pub async fn submit(&self, from: &ChainAccount, call: RaceCall) -> Result<TxHash, RaceError> {
        let method = call.method();
        let lease = self
            .nonces
            .reserve(&from.address)
            .await
            .map_err(|e| RaceError::ChainSubmissionFailed(e.to_string()))?;
        let nonce = lease.nonce();

        let request = TransactionRequest {
            from: from.clone(),
            nonce,
            call,
        };
        match self.chain.submit(request).await {
            Ok(hash) => {
                lease.commit();
                debug!(method, address = %from.address, nonce, tx = %hash, "Transaction submitted");
                Ok(hash)
            }
            Err(ChainError::NonceTooLow(reason)) => {
                warn!(method, address = %from.address, nonce, %reason, "Nonce rejected by chain");
                lease.invalidate();
                Err(RaceError::NonceConflict {
                    address: from.address.clone(),
                    nonce,
                })
            }
            Err(e) => Err(RaceError::ChainSubmissionFailed(e.to_string())),
        }
    }

    /// Submit `call` signed by the owner account.
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit).
    pub async fn submit_as_owner(&self, call: RaceCall) -> Result<TxHash, RaceError> {
        let owner = self.owner.clone();
        self.submit(&owner, call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{KeyRef, RateSnapshot};
    use crate::testkit::chain::FakeChain;

    fn owner() -> ChainAccount {
        ChainAccount::new("0xowner", KeyRef::new("k"))
    }

    fn rates_call() -> RaceCall {
        RaceCall::SetRates {
            bucket: 5,
            rates: RateSnapshot::new(),
        }
    }

    #[tokio::test]
    async fn successful_submissions_use_consecutive_nonces() {
        let chain = Arc::new(FakeChain::new());
        let gw = ChainGateway::new(Arc::clone(&chain) as Arc<dyn ChainClient>, owner());

        gw.submit_as_owner(rates_call()).await.unwrap();
        gw.submit_as_owner(rates_call()).await.unwrap();

        let nonces: Vec<u64> = chain.submitted().iter().map(|tx| tx.nonce).collect();
        assert_eq!(nonces, [0, 1]);
    }

    #[tokio::test]
    async fn failed_submission_does_not_burn_a_nonce() {
        let chain = Arc::new(FakeChain::new());
        let gw = ChainGateway::new(Arc::clone(&chain) as Arc<dyn ChainClient>, owner());

        chain.fail_next(ChainError::Transport("down".into()));
        let err = gw.submit_as_owner(rates_call()).await.unwrap_err();
        assert!(matches!(err, RaceError::ChainSubmissionFailed(_)));

        gw.submit_as_owner(rates_call()).await.unwrap();
        assert_eq!(chain.submitted()[0].nonce, 0);
    }

    #[tokio::test]
    async fn nonce_too_low_surfaces_as_conflict() {
        let chain = Arc::new(FakeChain::new());
        let gw = ChainGateway::new(Arc::clone(&chain) as Arc<dyn ChainClient>, owner());

        chain.fail_next(ChainError::NonceTooLow("nonce too low".into()));
        let err = gw.submit_as_owner(rates_call()).await.unwrap_err();
        assert_eq!(
            err,
            RaceError::NonceConflict {
                address: owner().address,
                nonce: 0
            }
        );
        assert_eq!(gw.nonces().watermark(&owner().address).await, None);
    }
}
