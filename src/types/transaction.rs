//! Canonical unsigned and signed transactions

use crate::chain::GasPrice;
use crate::error::{TransactorError, TransactorResult};

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, Bytes, Eip1559TransactionRequest, Signature, TransactionRequest, H256, U256,
};

/// Length of an `r || s || v` signature
pub const VALID_SIGNATURE_SIZE: usize = 65;

/// Fixed gas price transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTx {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
}

/// EIP-1559 fee cap / tip cap transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicFeeTx {
    pub nonce: u64,
    pub gas_tip_cap: U256,
    pub gas_fee_cap: U256,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
}

/// Transaction payload prior to signing. `to == None` creates a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsignedTransaction {
    Legacy(LegacyTx),
    DynamicFee(DynamicFeeTx),
}

impl UnsignedTransaction {
    pub fn nonce(&self) -> u64 {
        match self {
            UnsignedTransaction::Legacy(tx) => tx.nonce,
            UnsignedTransaction::DynamicFee(tx) => tx.nonce,
        }
    }

    pub fn gas_limit(&self) -> u64 {
        match self {
            UnsignedTransaction::Legacy(tx) => tx.gas_limit,
            UnsignedTransaction::DynamicFee(tx) => tx.gas_limit,
        }
    }

    pub fn to(&self) -> Option<Address> {
        match self {
            UnsignedTransaction::Legacy(tx) => tx.to,
            UnsignedTransaction::DynamicFee(tx) => tx.to,
        }
    }

    pub fn value(&self) -> U256 {
        match self {
            UnsignedTransaction::Legacy(tx) => tx.value,
            UnsignedTransaction::DynamicFee(tx) => tx.value,
        }
    }

    pub fn input(&self) -> &Bytes {
        match self {
            UnsignedTransaction::Legacy(tx) => &tx.input,
            UnsignedTransaction::DynamicFee(tx) => &tx.input,
        }
    }

    /// Legacy gas price; always `None` for dynamic fee transactions
    pub fn gas_price(&self) -> Option<U256> {
        match self {
            UnsignedTransaction::Legacy(tx) => Some(tx.gas_price),
            UnsignedTransaction::DynamicFee(_) => None,
        }
    }

    pub fn fee(&self) -> GasPrice {
        match self {
            UnsignedTransaction::Legacy(tx) => GasPrice::Legacy(tx.gas_price),
            UnsignedTransaction::DynamicFee(tx) => GasPrice::DynamicFee {
                max_fee_per_gas: tx.gas_fee_cap,
                max_priority_fee_per_gas: tx.gas_tip_cap,
            },
        }
    }

    pub fn is_contract_creation(&self) -> bool {
        self.to().is_none()
    }

    /// Fee model label
    pub fn kind(&self) -> &'static str {
        match self {
            UnsignedTransaction::Legacy(_) => "legacy",
            UnsignedTransaction::DynamicFee(_) => "dynamic_fee",
        }
    }

    /// Chain-bound ethers representation used for hashing and encoding
    pub fn to_typed(&self, chain_id: u64) -> TypedTransaction {
        match self {
            UnsignedTransaction::Legacy(tx) => {
                let mut req = TransactionRequest::new()
                    .nonce(tx.nonce)
                    .gas_price(tx.gas_price)
                    .gas(tx.gas_limit)
                    .value(tx.value)
                    .data(tx.input.clone())
                    .chain_id(chain_id);
                if let Some(to) = tx.to {
                    req = req.to(to);
                }
                TypedTransaction::Legacy(req)
            }
            UnsignedTransaction::DynamicFee(tx) => {
                let mut req = Eip1559TransactionRequest::new()
                    .nonce(tx.nonce)
                    .max_priority_fee_per_gas(tx.gas_tip_cap)
                    .max_fee_per_gas(tx.gas_fee_cap)
                    .gas(tx.gas_limit)
                    .value(tx.value)
                    .data(tx.input.clone())
                    .chain_id(chain_id);
                if let Some(to) = tx.to {
                    req = req.to(to);
                }
                TypedTransaction::Eip1559(req)
            }
        }
    }

    /// Digest the signer signs: EIP-155 for legacy, typed envelope for dynamic fee
    pub fn signing_hash(&self, chain_id: u64) -> H256 {
        self.to_typed(chain_id).sighash()
    }
}

/// Parse a 65 byte `r || s || v` signature into its chain-bound form.
///
/// `v` may be a recovery id (0/1) or the 27/28 form.
pub fn parse_signature(sig: &[u8], chain_id: u64) -> TransactorResult<Signature> {
    if sig.len() != VALID_SIGNATURE_SIZE {
        return Err(TransactorError::InvalidSignatureSize(sig.len()));
    }

    let recovery_id = match sig[64] {
        v @ 0..=1 => v as u64,
        v @ 27..=28 => (v - 27) as u64,
        v => {
            return Err(TransactorError::InvalidSignature(format!(
                "unsupported recovery byte {}",
                v
            )))
        }
    };

    Ok(Signature {
        r: U256::from_big_endian(&sig[0..32]),
        s: U256::from_big_endian(&sig[32..64]),
        v: recovery_id + 35 + chain_id * 2,
    })
}

/// Unsigned transaction bound to a chain and a signature. Immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTransaction {
    tx: UnsignedTransaction,
    chain_id: u64,
    signature: Signature,
    from: Address,
    hash: H256,
}

impl SignedTransaction {
    /// Attach a raw signature, recovering the sender it binds to
    pub fn from_parts(
        tx: UnsignedTransaction,
        chain_id: u64,
        sig: &[u8],
    ) -> TransactorResult<Self> {
        let signature = parse_signature(sig, chain_id)?;
        let typed = tx.to_typed(chain_id);

        let from = signature
            .recover(typed.sighash())
            .map_err(|e| TransactorError::InvalidSignature(e.to_string()))?;
        let hash = typed.hash(&signature);

        Ok(Self {
            tx,
            chain_id,
            signature,
            from,
            hash,
        })
    }

    pub fn transaction(&self) -> &UnsignedTransaction {
        &self.tx
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Sender recovered from the signature
    pub fn from(&self) -> Address {
        self.from
    }

    /// Transaction hash, its identifier on the network
    pub fn hash(&self) -> H256 {
        self.hash
    }

    pub fn nonce(&self) -> u64 {
        self.tx.nonce()
    }

    /// Canonical signed encoding as accepted by `eth_sendRawTransaction`
    pub fn raw(&self) -> Bytes {
        self.tx.to_typed(self.chain_id).rlp_signed(&self.signature)
    }

    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(self.raw()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::signers::{LocalWallet, Signer};

    const TEST_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn legacy_tx() -> UnsignedTransaction {
        UnsignedTransaction::Legacy(LegacyTx {
            nonce: 4,
            gas_price: U256::from(10),
            gas_limit: 21_000,
            to: Some(Address::repeat_byte(0xbb)),
            value: U256::from(1000),
            input: Bytes::default(),
        })
    }

    fn dynamic_tx() -> UnsignedTransaction {
        UnsignedTransaction::DynamicFee(DynamicFeeTx {
            nonce: 9,
            gas_tip_cap: U256::from(2),
            gas_fee_cap: U256::from(100),
            gas_limit: 50_000,
            to: None,
            value: U256::zero(),
            input: Bytes::from(vec![0x60, 0x80]),
        })
    }

    fn sign(tx: &UnsignedTransaction, chain_id: u64) -> (Address, Vec<u8>) {
        let wallet: LocalWallet = TEST_KEY.parse().unwrap();
        let sig = wallet.sign_hash(tx.signing_hash(chain_id)).unwrap();
        (wallet.address(), sig.to_vec())
    }

    #[test]
    fn test_signing_hash_is_chain_bound() {
        let tx = legacy_tx();
        assert_ne!(tx.signing_hash(1), tx.signing_hash(10));
        assert_eq!(tx.signing_hash(1), tx.signing_hash(1));

        let tx = dynamic_tx();
        assert_ne!(tx.signing_hash(1), tx.signing_hash(10));
    }

    #[test]
    fn test_dynamic_fee_never_exposes_legacy_price() {
        let tx = dynamic_tx();
        assert_eq!(tx.gas_price(), None);
        assert!(tx.is_contract_creation());
        assert!(matches!(tx.to_typed(1), TypedTransaction::Eip1559(_)));
    }

    #[test]
    fn test_signature_size_rejected() {
        for len in [0usize, 64, 66] {
            let err = parse_signature(&vec![1u8; len], 1).unwrap_err();
            assert!(matches!(err, TransactorError::InvalidSignatureSize(l) if l == len));
        }
    }

    #[test]
    fn test_unsupported_recovery_byte_rejected() {
        let mut sig = vec![1u8; 65];
        sig[64] = 5;
        assert!(matches!(
            parse_signature(&sig, 1),
            Err(TransactorError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_attach_recovers_sender_legacy() {
        let tx = legacy_tx();
        let (address, sig) = sign(&tx, 1);

        let signed = SignedTransaction::from_parts(tx.clone(), 1, &sig).unwrap();
        assert_eq!(signed.from(), address);
        assert_eq!(signed.nonce(), 4);
        assert_eq!(signed.signature().v, 37 + (sig[64] as u64 - 27));
        assert_eq!(signed.transaction(), &tx);
    }

    #[test]
    fn test_attach_recovers_sender_dynamic_fee_with_recovery_id() {
        let tx = dynamic_tx();
        let (address, mut sig) = sign(&tx, 10);
        // Same signature with v expressed as a bare recovery id
        sig[64] -= 27;

        let signed = SignedTransaction::from_parts(tx, 10, &sig).unwrap();
        assert_eq!(signed.from(), address);
        assert_eq!(signed.chain_id(), 10);
        assert_eq!(signed.raw()[0], 0x02);
        assert!(signed.raw_hex().starts_with("0x02"));
    }

    #[test]
    fn test_signature_for_other_chain_recovers_other_sender() {
        let tx = legacy_tx();
        let (address, sig) = sign(&tx, 1);

        let signed = SignedTransaction::from_parts(tx, 5, &sig).unwrap();
        assert_ne!(signed.from(), address);
    }

    #[test]
    fn test_hash_matches_raw_encoding() {
        let tx = legacy_tx();
        let (_, sig) = sign(&tx, 1);
        let signed = SignedTransaction::from_parts(tx, 1, &sig).unwrap();

        let expected: H256 = ethers::utils::keccak256(signed.raw()).into();
        assert_eq!(signed.hash(), expected);
    }
}
