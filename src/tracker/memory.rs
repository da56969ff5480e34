//! In-process tracker

use super::PendingTxTracker;
use crate::error::TransactorResult;
use crate::types::{PendingTransaction, TxStatus};

use async_trait::async_trait;
use dashmap::DashMap;
use ethers::types::{Address, H256};
use tracing::debug;

/// Pending records keyed by `(chain_id, hash)`
#[derive(Debug, Default)]
pub struct MemoryPendingTxTracker {
    records: DashMap<(u64, H256), PendingTransaction>,
}

impl MemoryPendingTxTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, chain_id: u64, hash: H256) -> Option<PendingTransaction> {
        self.records.get(&(chain_id, hash)).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Set the status of a tracked transaction; returns false if unknown
    pub fn update_status(&self, chain_id: u64, hash: H256, status: TxStatus) -> bool {
        match self.records.get_mut(&(chain_id, hash)) {
            Some(mut record) => {
                record.status = Some(status);
                true
            }
            None => false,
        }
    }

    /// Drop records that are no longer pending and allow auto deletion
    pub fn prune(&self) -> usize {
        let before = self.records.len();
        self.records.retain(|_, r| {
            r.effective_status() == TxStatus::Pending || !r.effective_auto_delete()
        });
        before - self.records.len()
    }
}

#[async_trait]
impl PendingTxTracker for MemoryPendingTxTracker {
    async fn count_pending_from_nonce(
        &self,
        chain_id: u64,
        address: Address,
        nonce: u64,
    ) -> TransactorResult<u64> {
        let count = self
            .records
            .iter()
            .filter(|entry| {
                let r = entry.value();
                r.chain_id == chain_id
                    && r.from == address
                    && r.nonce >= nonce
                    && r.effective_status() == TxStatus::Pending
            })
            .count();

        Ok(count as u64)
    }

    async fn store_and_track(&self, tx: &PendingTransaction) -> TransactorResult<()> {
        let key = (tx.chain_id, tx.hash);
        if self.records.contains_key(&key) {
            debug!("Transaction {:?} already tracked", tx.hash);
            return Ok(());
        }

        self.records.entry(key).or_insert_with(|| tx.clone());
        debug!(
            "Tracking transaction {:?} on chain {} (nonce {})",
            tx.hash, tx.chain_id, tx.nonce
        );
        Ok(())
    }
}
