//! Pluggable signing capability

mod local;

pub use local::PrivateKeySigner;

use crate::error::TransactorResult;
use async_trait::async_trait;

/// Signs a transaction signing hash.
///
/// Implementations return `r || s || v`; the 65 byte length is checked by the
/// caller before the signature is attached.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TxSigner: Send + Sync {
    async fn sign(&self, payload: &[u8]) -> TransactorResult<Vec<u8>>;
}
