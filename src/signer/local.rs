use super::TxSigner;
use crate::error::{TransactorError, TransactorResult};

use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, H256};
use std::sync::Arc;

/// Signs with a raw secp256k1 key held in memory
#[derive(Clone)]
pub struct PrivateKeySigner {
    wallet: Arc<LocalWallet>,
}

impl PrivateKeySigner {
    pub fn new(wallet: LocalWallet) -> Self {
        Self {
            wallet: Arc::new(wallet),
        }
    }

    /// Hex encoded key, with or without `0x`
    pub fn from_hex(key: &str) -> TransactorResult<Self> {
        key.parse::<LocalWallet>()
            .map(Self::new)
            .map_err(|e| TransactorError::Wallet(format!("Invalid private key: {}", e)))
    }

    /// Load the key from an environment variable
    pub fn from_env(var: &str) -> TransactorResult<Self> {
        let key = std::env::var(var).map_err(|_| {
            TransactorError::Wallet(format!("No wallet configured. Set {}", var))
        })?;
        Self::from_hex(&key)
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }
}

#[async_trait]
impl TxSigner for PrivateKeySigner {
    async fn sign(&self, payload: &[u8]) -> TransactorResult<Vec<u8>> {
        if payload.len() != 32 {
            return Err(TransactorError::Sign(format!(
                "expected a 32 byte hash, got {} bytes",
                payload.len()
            )));
        }

        let signature = self
            .wallet
            .sign_hash(H256::from_slice(payload))
            .map_err(|e| TransactorError::Sign(e.to_string()))?;

        Ok(signature.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Signature;

    const TEST_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[tokio::test]
    async fn test_signature_recovers_signer_address() {
        let signer = PrivateKeySigner::from_hex(TEST_KEY).unwrap();
        let hash = H256::repeat_byte(0x42);

        let raw = signer.sign(hash.as_bytes()).await.unwrap();
        assert_eq!(raw.len(), 65);

        let signature = Signature::try_from(raw.as_slice()).unwrap();
        assert_eq!(signature.recover(hash).unwrap(), signer.address());
    }

    #[tokio::test]
    async fn test_rejects_non_hash_payload() {
        let signer = PrivateKeySigner::from_hex(TEST_KEY).unwrap();
        let err = signer.sign(b"not a hash").await.unwrap_err();
        assert!(matches!(err, TransactorError::Sign(_)));
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("PRIVATE_KEY_SIGNER_TEST", TEST_KEY);
        let signer = PrivateKeySigner::from_env("PRIVATE_KEY_SIGNER_TEST").unwrap();
        assert_eq!(
            signer.address(),
            PrivateKeySigner::from_hex(TEST_KEY).unwrap().address()
        );

        assert!(matches!(
            PrivateKeySigner::from_env("PRIVATE_KEY_SIGNER_UNSET").err(),
            Some(TransactorError::Wallet(_))
        ));
    }

    #[test]
    fn test_invalid_key() {
        assert!(matches!(
            PrivateKeySigner::from_hex("zz").err(),
            Some(TransactorError::Wallet(_))
        ));
    }
}
