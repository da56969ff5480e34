//! PostgreSQL pending transaction tracker

use super::PendingTxTracker;
use crate::config::DatabaseConfig;
use crate::error::{TransactorError, TransactorResult};
use crate::types::{PendingTransaction, TxStatus};

use async_trait::async_trait;
use ethers::types::{Address, H256};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::{debug, info};

/// Tracker persisting to the `pending_transactions` table
pub struct PgPendingTxTracker {
    pool: PgPool,
}

impl PgPendingTxTracker {
    /// Connect using the `[database]` settings
    pub async fn new(config: &DatabaseConfig) -> TransactorResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the table and its indexes if missing
    pub async fn run_migrations(&self) -> TransactorResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pending_transactions (
                network_id BIGINT NOT NULL,
                hash VARCHAR(66) NOT NULL,
                timestamp BIGINT NOT NULL,
                from_address VARCHAR(42) NOT NULL,
                to_address VARCHAR(42),
                value TEXT NOT NULL,
                data BYTEA NOT NULL,
                symbol TEXT NOT NULL,
                gas_price TEXT NOT NULL,
                gas_limit BIGINT NOT NULL,
                type VARCHAR(32) NOT NULL,
                additional_data TEXT NOT NULL,
                multi_transaction_id BIGINT NOT NULL,
                nonce BIGINT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'Pending',
                auto_delete BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (network_id, hash)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_pending_sender_nonce
            ON pending_transactions (network_id, from_address, nonce)
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Database migrations complete");
        Ok(())
    }

    /// Health check
    pub async fn health_check(&self) -> TransactorResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Record the outcome reported by a confirmation watcher
    pub async fn update_status(
        &self,
        chain_id: u64,
        hash: H256,
        status: TxStatus,
    ) -> TransactorResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE pending_transactions
            SET status = $1
            WHERE network_id = $2 AND hash = $3
            "#,
        )
        .bind(status.as_str())
        .bind(chain_id as i64)
        .bind(format!("{:?}", hash))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Status of a tracked transaction, if any
    pub async fn get_status(&self, chain_id: u64, hash: H256) -> TransactorResult<Option<TxStatus>> {
        let row = sqlx::query(
            "SELECT status FROM pending_transactions WHERE network_id = $1 AND hash = $2",
        )
        .bind(chain_id as i64)
        .bind(format!("{:?}", hash))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| parse_status(&r.get::<String, _>("status")))
            .transpose()
    }

    /// Delete finished rows flagged for auto deletion
    pub async fn prune(&self) -> TransactorResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM pending_transactions
            WHERE status <> 'Pending' AND auto_delete = TRUE
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

fn parse_status(value: &str) -> TransactorResult<TxStatus> {
    match value {
        "Pending" => Ok(TxStatus::Pending),
        "Success" => Ok(TxStatus::Success),
        "Failed" => Ok(TxStatus::Failed),
        other => Err(TransactorError::Tracking(format!(
            "unknown transaction status {}",
            other
        ))),
    }
}

#[async_trait]
impl PendingTxTracker for PgPendingTxTracker {
    async fn count_pending_from_nonce(
        &self,
        chain_id: u64,
        address: Address,
        nonce: u64,
    ) -> TransactorResult<u64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS pending
            FROM pending_transactions
            WHERE network_id = $1 AND from_address = $2 AND nonce >= $3 AND status = 'Pending'
            "#,
        )
        .bind(chain_id as i64)
        .bind(format!("{:?}", address))
        .bind(nonce as i64)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("pending").max(0) as u64)
    }

    async fn store_and_track(&self, tx: &PendingTransaction) -> TransactorResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO pending_transactions
                (network_id, hash, timestamp, from_address, to_address, value, data, symbol,
                 gas_price, gas_limit, type, additional_data, multi_transaction_id, nonce,
                 status, auto_delete)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (network_id, hash) DO NOTHING
            "#,
        )
        .bind(tx.chain_id as i64)
        .bind(format!("{:?}", tx.hash))
        .bind(tx.timestamp as i64)
        .bind(format!("{:?}", tx.from))
        .bind(tx.to.map(|to| format!("{:?}", to)))
        .bind(tx.value.to_string())
        .bind(tx.data.to_vec())
        .bind(&tx.symbol)
        .bind(tx.gas_price.to_string())
        .bind(tx.gas_limit as i64)
        .bind(tx.tx_type.as_str())
        .bind(&tx.additional_data)
        .bind(tx.multi_transaction_id.0)
        .bind(tx.nonce as i64)
        .bind(tx.effective_status().as_str())
        .bind(tx.effective_auto_delete())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!("Transaction {:?} already tracked", tx.hash);
        } else {
            debug!(
                "Stored pending transaction {:?} for chain {}",
                tx.hash, tx.chain_id
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        for status in [TxStatus::Pending, TxStatus::Success, TxStatus::Failed] {
            assert_eq!(parse_status(status.as_str()).unwrap(), status);
        }
        assert!(matches!(
            parse_status("Dropped"),
            Err(TransactorError::Tracking(_))
        ));
    }

    #[test]
    fn test_address_column_format() {
        let address = Address::repeat_byte(0xab);
        let column = format!("{:?}", address);
        assert_eq!(column.len(), 42);
        assert!(column.starts_with("0xabab"));
    }
}
