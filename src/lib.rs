//! EVM Transactor - transaction construction, signing and propagation
//!
//! Turns a high-level send request into a signed transaction: resolves the
//! nonce and gas, builds a legacy or dynamic fee transaction, signs its
//! chain-bound hash through a pluggable signer, broadcasts it and records it
//! for pending-status tracking.

pub mod chain;
pub mod config;
pub mod error;
pub mod metrics;
pub mod signer;
pub mod tracker;
pub mod tx;
pub mod types;

pub use chain::{ChainProvider, GasPrice, LedgerClient};
pub use config::Settings;
pub use error::{TransactorError, TransactorResult};
pub use signer::{PrivateKeySigner, TxSigner};
pub use tracker::{
    MemoryPendingTxTracker, NoopPendingTxTracker, PendingTxTracker, PgPendingTxTracker,
};
pub use tx::{SendOutcome, Transactor};
pub use types::{
    PendingTransaction, SendArgs, SignedTransaction, UnsignedTransaction, ValidatedArgs,
};
