//! Transaction intent, canonical transactions and pending records

pub mod args;
pub mod pending;
pub mod transaction;

pub use args::{FeeMode, MultiTransactionId, SendArgs, ValidatedArgs};
pub use pending::{PendingTransaction, PendingTxType, TxStatus};
pub use transaction::{
    parse_signature, DynamicFeeTx, LegacyTx, SignedTransaction, UnsignedTransaction,
    VALID_SIGNATURE_SIZE,
};
