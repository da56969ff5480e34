//! Pending transaction tracking
//!
//! Handles:
//! - Recording broadcast transactions until a watcher confirms them
//! - Counting in-flight transactions for chains whose pending nonce ignores the mempool

mod memory;
mod postgres;

pub use memory::MemoryPendingTxTracker;
pub use postgres::PgPendingTxTracker;

use crate::error::TransactorResult;
use crate::types::PendingTransaction;

use async_trait::async_trait;
use ethers::types::Address;

/// Store for broadcast-but-unconfirmed transactions.
///
/// `store_and_track` must be idempotent by transaction hash.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PendingTxTracker: Send + Sync {
    /// Number of pending transactions of `address` with a nonce of at least `nonce`
    async fn count_pending_from_nonce(
        &self,
        chain_id: u64,
        address: Address,
        nonce: u64,
    ) -> TransactorResult<u64>;

    async fn store_and_track(&self, tx: &PendingTransaction) -> TransactorResult<()>;
}

/// Tracker used when none is configured. Stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPendingTxTracker;

#[async_trait]
impl PendingTxTracker for NoopPendingTxTracker {
    /// Always assumes one transaction is in flight
    async fn count_pending_from_nonce(
        &self,
        _chain_id: u64,
        _address: Address,
        _nonce: u64,
    ) -> TransactorResult<u64> {
        Ok(1)
    }

    async fn store_and_track(&self, _tx: &PendingTransaction) -> TransactorResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_tracker() {
        let tracker = NoopPendingTxTracker;
        let count = tokio_test::block_on(tracker.count_pending_from_nonce(
            10,
            Address::repeat_byte(0x01),
            42,
        ))
        .unwrap();
        assert_eq!(count, 1);
    }
}
