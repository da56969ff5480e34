//! Broadcast-but-unconfirmed transaction records handed to a tracker

use super::args::MultiTransactionId;
use super::transaction::SignedTransaction;

use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Values of the status column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Pending,
    Success,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "Pending",
            TxStatus::Success => "Success",
            TxStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the pending transaction does, for display and bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingTxType {
    WalletTransfer,
    ContractDeployment,
    WalletConnectTransfer,
}

impl PendingTxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingTxType::WalletTransfer => "WalletTransfer",
            PendingTxType::ContractDeployment => "ContractDeployment",
            PendingTxType::WalletConnectTransfer => "WalletConnectTransfer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransaction {
    pub hash: H256,
    /// Unix seconds at broadcast
    pub timestamp: u64,
    pub value: U256,
    pub from: Address,
    /// `None` for contract creation
    pub to: Option<Address>,
    pub data: Bytes,
    pub symbol: String,
    /// Legacy price, or the fee cap of a dynamic fee transaction
    pub gas_price: U256,
    pub gas_limit: u64,
    #[serde(rename = "type")]
    pub tx_type: PendingTxType,
    pub additional_data: String,
    #[serde(rename = "network_id")]
    pub chain_id: u64,
    #[serde(rename = "multi_transaction_id")]
    pub multi_transaction_id: MultiTransactionId,
    pub nonce: u64,
    /// `None` is stored as `Pending`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TxStatus>,
    /// `None` is stored as `true`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_delete: Option<bool>,
}

impl PendingTransaction {
    /// Project a just-broadcast transaction into a tracking record
    pub fn from_signed(
        from: Address,
        symbol: &str,
        multi_transaction_id: MultiTransactionId,
        signed: &SignedTransaction,
    ) -> Self {
        let tx = signed.transaction();
        let tx_type = if tx.is_contract_creation() {
            PendingTxType::ContractDeployment
        } else {
            PendingTxType::WalletTransfer
        };

        Self {
            hash: signed.hash(),
            timestamp: chrono::Utc::now().timestamp().max(0) as u64,
            value: tx.value(),
            from,
            to: tx.to(),
            data: tx.input().clone(),
            symbol: symbol.to_string(),
            gas_price: tx.fee().price_cap(),
            gas_limit: tx.gas_limit(),
            tx_type,
            additional_data: String::new(),
            chain_id: signed.chain_id(),
            multi_transaction_id,
            nonce: tx.nonce(),
            status: None,
            // Removed by the confirmation watcher, not on its own
            auto_delete: Some(false),
        }
    }

    pub fn effective_status(&self) -> TxStatus {
        self.status.unwrap_or(TxStatus::Pending)
    }

    pub fn effective_auto_delete(&self) -> bool {
        self.auto_delete.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DynamicFeeTx, LegacyTx, UnsignedTransaction};
    use ethers::signers::LocalWallet;

    fn signed(tx: UnsignedTransaction) -> SignedTransaction {
        let wallet: LocalWallet = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318"
            .parse()
            .unwrap();
        let sig = wallet.sign_hash(tx.signing_hash(1)).unwrap();
        SignedTransaction::from_parts(tx, 1, &sig.to_vec()).unwrap()
    }

    #[test]
    fn test_transfer_record_defaults() {
        let tx = signed(UnsignedTransaction::Legacy(LegacyTx {
            nonce: 3,
            gas_price: U256::from(10),
            gas_limit: 21_000,
            to: Some(Address::repeat_byte(0xbb)),
            value: U256::from(1000),
            input: Bytes::default(),
        }));

        let record = PendingTransaction::from_signed(
            tx.from(),
            "ETH",
            MultiTransactionId(7),
            &tx,
        );

        assert_eq!(record.hash, tx.hash());
        assert_eq!(record.tx_type, PendingTxType::WalletTransfer);
        assert_eq!(record.effective_status(), TxStatus::Pending);
        assert!(!record.effective_auto_delete());
        assert_eq!(record.gas_price, U256::from(10));
        assert_eq!(record.nonce, 3);
        assert_eq!(record.chain_id, 1);
        assert!(record.timestamp > 0);
    }

    #[test]
    fn test_contract_creation_record() {
        let tx = signed(UnsignedTransaction::DynamicFee(DynamicFeeTx {
            nonce: 0,
            gas_tip_cap: U256::from(2),
            gas_fee_cap: U256::from(100),
            gas_limit: 200_000,
            to: None,
            value: U256::zero(),
            input: Bytes::from(vec![0x60, 0x80]),
        }));

        let record =
            PendingTransaction::from_signed(tx.from(), "", MultiTransactionId::default(), &tx);
        assert_eq!(record.tx_type, PendingTxType::ContractDeployment);
        assert_eq!(record.to, None);
        assert_eq!(record.gas_price, U256::from(100));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "ContractDeployment");
        assert_eq!(json["network_id"], 1);
        assert!(json.get("status").is_none());
        assert_eq!(json["autoDelete"], false);
    }
}
