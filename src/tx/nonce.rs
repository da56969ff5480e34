//! Nonce resolution
//!
//! Handles:
//! - Explicit and caller-tracked nonces
//! - Pending nonce lookups against the ledger
//! - Chains whose pending nonce does not include in-flight transactions

use crate::chain::LedgerClient;
use crate::error::{TransactorError, TransactorResult};
use crate::tracker::PendingTxTracker;

use ethers::types::Address;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub const OPTIMISM_MAINNET: u64 = 10;
pub const OPTIMISM_GOERLI: u64 = 420;
pub const OPTIMISM_SEPOLIA: u64 = 11_155_420;

/// How the network pending nonce is turned into the next usable nonce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoncePolicy {
    /// The node's pending nonce already accounts for the mempool
    Standard,
    /// The node reports last executed + 1; add what the tracker holds in flight
    IncludeTrackedPending,
}

/// Chain ids that get `IncludeTrackedPending` unless configured otherwise
pub fn default_tracked_pending_chains() -> Vec<u64> {
    vec![OPTIMISM_MAINNET, OPTIMISM_GOERLI, OPTIMISM_SEPOLIA]
}

/// Resolves the nonce of the next transaction of a sender
pub struct NonceResolver {
    client: Arc<dyn LedgerClient>,
    tracker: Arc<dyn PendingTxTracker>,
    policies: HashMap<u64, NoncePolicy>,
}

impl NonceResolver {
    /// Create a resolver with the default rollup table
    pub fn new(client: Arc<dyn LedgerClient>, tracker: Arc<dyn PendingTxTracker>) -> Self {
        Self::with_tracked_chains(client, tracker, default_tracked_pending_chains())
    }

    pub fn with_tracked_chains(
        client: Arc<dyn LedgerClient>,
        tracker: Arc<dyn PendingTxTracker>,
        chains: impl IntoIterator<Item = u64>,
    ) -> Self {
        let policies = chains
            .into_iter()
            .map(|chain_id| (chain_id, NoncePolicy::IncludeTrackedPending))
            .collect();

        Self {
            client,
            tracker,
            policies,
        }
    }

    pub fn policy(&self, chain_id: u64) -> NoncePolicy {
        self.policies
            .get(&chain_id)
            .copied()
            .unwrap_or(NoncePolicy::Standard)
    }

    /// Next nonce according to the network, adjusted by the chain policy
    pub async fn next_nonce(&self, chain_id: u64, from: Address) -> TransactorResult<u64> {
        let nonce = self.client.pending_nonce_at(from).await?;

        match self.policy(chain_id) {
            NoncePolicy::Standard => Ok(nonce),
            NoncePolicy::IncludeTrackedPending => {
                let in_flight = self
                    .tracker
                    .count_pending_from_nonce(chain_id, from, nonce)
                    .await
                    .map_err(|e| TransactorError::Nonce {
                        chain_id,
                        message: format!("failed to count pending transactions: {}", e),
                    })?;

                debug!(
                    "Chain {} pending nonce {} adjusted by {} tracked transactions",
                    chain_id, nonce, in_flight
                );
                Ok(nonce + in_flight)
            }
        }
    }

    /// Pick the nonce for a new transaction.
    ///
    /// A negative `last_used` means the caller does not track nonces.
    pub async fn resolve_nonce(
        &self,
        chain_id: u64,
        from: Address,
        explicit: Option<u64>,
        last_used: i64,
    ) -> TransactorResult<u64> {
        if let Some(nonce) = explicit {
            return Ok(nonce);
        }

        if last_used < 0 {
            return self.next_nonce(chain_id, from).await;
        }

        Ok(last_used as u64 + 1)
    }
}
