//! Chain module - the ledger client seam used by the transactor
//!
//! This module provides:
//! - The `LedgerClient` trait the pipeline depends on
//! - Fee parameters shared by estimation and building
//! - A multi-RPC HTTP implementation with automatic failover

pub mod provider;

pub use provider::ChainProvider;

use crate::error::TransactorResult;
use crate::types::SignedTransaction;

use async_trait::async_trait;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, TransactionRequest, U256};

/// Operations the transactor needs from a ledger node
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Next nonce for `address` including the node's view of the mempool
    async fn pending_nonce_at(&self, address: Address) -> TransactorResult<u64>;

    /// Gas units the call would consume
    async fn estimate_gas(&self, call: &CallRequest) -> TransactorResult<u64>;

    /// Legacy gas price suggested by the node
    async fn suggest_gas_price(&self) -> TransactorResult<U256>;

    /// Submit a signed transaction
    async fn send_transaction(&self, tx: &SignedTransaction) -> TransactorResult<()>;

    /// Raw JSON-RPC call whose result is discarded
    async fn call_raw(&self, method: &str, params: Vec<serde_json::Value>) -> TransactorResult<()>;
}

/// Gas price types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasPrice {
    Legacy(U256),
    DynamicFee {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
}

impl GasPrice {
    /// Price per gas unit used as the upper bound of the fee
    pub fn price_cap(&self) -> U256 {
        match self {
            GasPrice::Legacy(price) => *price,
            GasPrice::DynamicFee {
                max_fee_per_gas, ..
            } => *max_fee_per_gas,
        }
    }

    /// Calculate the maximum total cost in wei
    pub fn calculate_cost(&self, gas_limit: u64) -> U256 {
        U256::from(gas_limit).saturating_mul(self.price_cap())
    }
}

/// Call shape used for gas estimation
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub fee: GasPrice,
}

impl CallRequest {
    /// Convert into an ethers request of the matching fee model
    pub fn to_typed(&self) -> TypedTransaction {
        match &self.fee {
            GasPrice::Legacy(price) => {
                let mut tx = TransactionRequest::new()
                    .from(self.from)
                    .value(self.value)
                    .data(self.data.clone())
                    .gas_price(*price);
                if let Some(to) = self.to {
                    tx = tx.to(to);
                }
                TypedTransaction::Legacy(tx)
            }
            GasPrice::DynamicFee {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                let mut tx = Eip1559TransactionRequest::new()
                    .from(self.from)
                    .value(self.value)
                    .data(self.data.clone())
                    .max_fee_per_gas(*max_fee_per_gas)
                    .max_priority_fee_per_gas(*max_priority_fee_per_gas);
                if let Some(to) = self.to {
                    tx = tx.to(to);
                }
                TypedTransaction::Eip1559(tx)
            }
        }
    }
}
