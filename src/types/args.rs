//! Caller-supplied send intent and its validated form

use crate::error::{TransactorError, TransactorResult};

use ethers::types::{Address, Bytes, U256, U64};
use serde::{Deserialize, Serialize};

/// Correlates the transactions of one multi-step user operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultiTransactionId(pub i64);

/// Transaction intent as received from the caller
///
/// Quantities use the JSON-RPC hex encoding when (de)serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendArgs {
    pub from: Address,
    /// Absent for contract creation
    pub to: Option<Address>,
    pub gas: Option<U64>,
    pub gas_price: Option<U256>,
    pub value: Option<U256>,
    pub nonce: Option<U64>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    #[serde(default)]
    pub input: Bytes,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub multi_transaction_id: MultiTransactionId,
    #[serde(default)]
    pub symbol: String,
}

impl SendArgs {
    /// Dynamic fee parameters are set for the transaction
    pub fn is_dynamic_fee_tx(&self) -> bool {
        self.max_fee_per_gas.is_some() && self.max_priority_fee_per_gas.is_some()
    }

    /// Either `input` or `data`, depending on which one is filled
    pub fn input(&self) -> &Bytes {
        if !self.input.is_empty() {
            &self.input
        } else {
            &self.data
        }
    }

    /// Only rejects when both payload fields are filled and differ.
    pub fn is_valid(&self) -> bool {
        if self.input.is_empty() || self.data.is_empty() {
            return true;
        }

        self.input == self.data
    }

    /// Validate and normalize into the form consumed by the resolver and builder
    pub fn validate(&self) -> TransactorResult<ValidatedArgs> {
        if !self.is_valid() {
            return Err(TransactorError::InvalidArgs(
                "input and data are both set and differ".to_string(),
            ));
        }

        let fee = match (self.max_fee_per_gas, self.max_priority_fee_per_gas) {
            (Some(max_fee_per_gas), Some(max_priority_fee_per_gas)) => FeeMode::DynamicFee {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            },
            _ => FeeMode::Legacy {
                gas_price: self.gas_price,
            },
        };

        Ok(ValidatedArgs {
            from: self.from,
            to: self.to,
            gas: self.gas.map(|g| g.as_u64()),
            value: self.value,
            nonce: self.nonce.map(|n| n.as_u64()),
            fee,
            input: self.input().clone(),
            multi_transaction_id: self.multi_transaction_id,
            symbol: self.symbol.clone(),
        })
    }
}

/// Fee model requested by the caller, before any network defaults are applied
#[derive(Debug, Clone, PartialEq)]
pub enum FeeMode {
    Legacy {
        gas_price: Option<U256>,
    },
    DynamicFee {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
}

/// Send arguments that passed validation. Read-only from here on.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedArgs {
    from: Address,
    to: Option<Address>,
    gas: Option<u64>,
    value: Option<U256>,
    nonce: Option<u64>,
    fee: FeeMode,
    input: Bytes,
    multi_transaction_id: MultiTransactionId,
    symbol: String,
}

impl ValidatedArgs {
    pub fn from(&self) -> Address {
        self.from
    }

    pub fn to(&self) -> Option<Address> {
        self.to
    }

    pub fn gas(&self) -> Option<u64> {
        self.gas
    }

    pub fn value(&self) -> Option<U256> {
        self.value
    }

    pub fn nonce(&self) -> Option<u64> {
        self.nonce
    }

    pub fn fee(&self) -> &FeeMode {
        &self.fee
    }

    pub fn is_dynamic_fee_tx(&self) -> bool {
        matches!(self.fee, FeeMode::DynamicFee { .. })
    }

    /// Effective payload
    pub fn input(&self) -> &Bytes {
        &self.input
    }

    pub fn multi_transaction_id(&self) -> MultiTransactionId {
        self.multi_transaction_id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}
