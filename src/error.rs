//! Error types for the transactor

use thiserror::Error;

/// Main error type for transaction construction, signing and propagation
#[derive(Error, Debug)]
pub enum TransactorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Chain connection error for chain {chain_id}: {message}")]
    ChainConnection { chain_id: u64, message: String },

    /// Conflicting or malformed send arguments
    #[error("transaction arguments are invalid: {0}")]
    InvalidArgs(String),

    #[error("bad nonce. expected {expected}, got {actual}")]
    BadNonce { actual: u64, expected: u64 },

    #[error("signature size must be 65, got {0}")]
    InvalidSignatureSize(usize),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Nonce error for chain {chain_id}: {message}")]
    Nonce { chain_id: u64, message: String },

    #[error("Gas estimation error: {0}")]
    GasEstimation(String),

    #[error("Gas price suggestion error: {0}")]
    PriceSuggestion(String),

    #[error("Signing error: {0}")]
    Sign(String),

    #[error("Broadcast error: {0}")]
    Broadcast(String),

    /// Raised after a successful broadcast; the transaction is already on the network
    #[error("Pending transaction tracking error: {0}")]
    Tracking(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransactorError {
    /// Check if the operation can be retried as is
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransactorError::ChainConnection { .. }
                | TransactorError::Broadcast(_)
                | TransactorError::GasEstimation(_)
                | TransactorError::PriceSuggestion(_)
        )
    }

    /// Check if the error means the transaction was never sent.
    ///
    /// Tracking failures happen after broadcast and are only warnings.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TransactorError::Tracking(_))
    }

    /// Short stage label used for metrics
    pub fn stage(&self) -> &'static str {
        match self {
            TransactorError::InvalidArgs(_) => "validate",
            TransactorError::BadNonce { .. } | TransactorError::Nonce { .. } => "nonce",
            TransactorError::GasEstimation(_) | TransactorError::PriceSuggestion(_) => "gas",
            TransactorError::InvalidSignatureSize(_)
            | TransactorError::InvalidSignature(_)
            | TransactorError::Sign(_)
            | TransactorError::Wallet(_) => "sign",
            TransactorError::Broadcast(_) | TransactorError::ChainConnection { .. } => "broadcast",
            TransactorError::Tracking(_) | TransactorError::Database(_) => "track",
            TransactorError::Config(_) | TransactorError::Internal(_) => "internal",
        }
    }
}

/// Result type for transactor operations
pub type TransactorResult<T> = Result<T, TransactorError>;
