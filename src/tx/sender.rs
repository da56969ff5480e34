//! Transaction orchestration: build, sign, broadcast and track

use super::builder::{self, BuildObserver, LoggingObserver};
use super::gas::GasResolver;
use super::nonce::{default_tracked_pending_chains, NonceResolver};
use crate::chain::{ChainProvider, LedgerClient};
use crate::config::Settings;
use crate::error::{TransactorError, TransactorResult};
use crate::metrics;
use crate::signer::TxSigner;
use crate::tracker::{NoopPendingTxTracker, PendingTxTracker, PgPendingTxTracker};
use crate::types::{
    MultiTransactionId, PendingTransaction, SendArgs, SignedTransaction, UnsignedTransaction,
    ValidatedArgs, VALID_SIGNATURE_SIZE,
};

use ethers::types::{Address, Bytes, H256, U256};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of a successful broadcast
#[derive(Debug)]
pub struct SendOutcome {
    pub tx_hash: H256,
    pub nonce: u64,
    /// Set when the transaction went out but the tracker could not record it
    pub tracking_error: Option<TransactorError>,
}

/// Builds, signs and propagates transactions for one ledger client
pub struct Transactor {
    /// Chain used by `send_transaction`
    chain_id: u64,
    client: Arc<dyn LedgerClient>,
    tracker: Arc<dyn PendingTxTracker>,
    nonces: NonceResolver,
    gas: GasResolver,
    observer: Arc<dyn BuildObserver>,
}

impl Transactor {
    /// Create a transactor; without a tracker nothing is recorded
    pub fn new(
        client: Arc<dyn LedgerClient>,
        chain_id: u64,
        tracker: Option<Arc<dyn PendingTxTracker>>,
    ) -> Self {
        let tracker = tracker.unwrap_or_else(|| Arc::new(NoopPendingTxTracker));

        Self {
            chain_id,
            nonces: NonceResolver::new(client.clone(), tracker.clone()),
            gas: GasResolver::new(client.clone()),
            client,
            tracker,
            observer: Arc::new(LoggingObserver),
        }
    }

    /// Replace the chains whose pending nonce includes tracked transactions
    pub fn with_tracked_pending_chains(mut self, chains: impl IntoIterator<Item = u64>) -> Self {
        self.nonces =
            NonceResolver::with_tracked_chains(self.client.clone(), self.tracker.clone(), chains);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn BuildObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Wire up provider, tracker and nonce table from configuration
    pub async fn from_settings(settings: &Settings) -> TransactorResult<Self> {
        let chain_id = settings.transactor.chain_id;
        let provider = ChainProvider::new(chain_id, &settings.chain)?;

        let tracker: Option<Arc<dyn PendingTxTracker>> = match &settings.database {
            Some(db) => {
                let tracker = PgPendingTxTracker::new(db).await?;
                tracker.run_migrations().await?;
                Some(Arc::new(tracker))
            }
            None => {
                warn!("No database configured, pending transactions will not be tracked");
                None
            }
        };

        let chains = settings
            .nonce
            .tracked_pending_chains
            .clone()
            .unwrap_or_else(default_tracked_pending_chains);

        info!(
            "Transactor initialized for chain {} ({})",
            chain_id,
            provider.name()
        );

        Ok(Self::new(Arc::new(provider), chain_id, tracker).with_tracked_pending_chains(chains))
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Build, sign and broadcast on the default chain
    pub async fn send_transaction(
        &self,
        args: &SendArgs,
        signer: &dyn TxSigner,
        last_used_nonce: i64,
    ) -> TransactorResult<SendOutcome> {
        self.send_transaction_with_chain_id(self.chain_id, args, signer, last_used_nonce)
            .await
    }

    /// Build, sign and broadcast.
    ///
    /// Nothing reaches the tracker unless the broadcast succeeded.
    pub async fn send_transaction_with_chain_id(
        &self,
        chain_id: u64,
        args: &SendArgs,
        signer: &dyn TxSigner,
        last_used_nonce: i64,
    ) -> TransactorResult<SendOutcome> {
        let started = Instant::now();

        let result = self
            .validate_and_propagate(chain_id, args, signer, last_used_nonce)
            .await;

        match &result {
            Ok(outcome) => {
                metrics::record_send_latency(chain_id, started.elapsed().as_secs_f64());
                debug!("Sent {:?} with nonce {}", outcome.tx_hash, outcome.nonce);
            }
            Err(e) => {
                metrics::record_tx_failed(chain_id, e);
                warn!("Transaction from {:?} on chain {} failed: {}", args.from, chain_id, e);
            }
        }

        result
    }

    async fn validate_and_propagate(
        &self,
        chain_id: u64,
        args: &SendArgs,
        signer: &dyn TxSigner,
        last_used_nonce: i64,
    ) -> TransactorResult<SendOutcome> {
        let (tx, _) = self
            .validate_and_build_transaction(chain_id, args, last_used_nonce)
            .await?;

        let hash = tx.signing_hash(chain_id);
        let sig = signer.sign(hash.as_bytes()).await?;
        let signed = self.add_signature_to_transaction(chain_id, tx, &sig)?;

        self.send_transaction_with_signature(
            args.from,
            &args.symbol,
            args.multi_transaction_id,
            &signed,
        )
        .await
    }

    /// Validate the arguments and build the unsigned transaction with network defaults
    pub async fn validate_and_build_transaction(
        &self,
        chain_id: u64,
        args: &SendArgs,
        last_used_nonce: i64,
    ) -> TransactorResult<(UnsignedTransaction, u64)> {
        let args = args.validate()?;

        let nonce = self
            .nonces
            .resolve_nonce(chain_id, args.from(), args.nonce(), last_used_nonce)
            .await?;
        let (gas_limit, fee) = self.gas.resolve_gas_and_price(&args).await?;

        let tx = builder::build(
            nonce,
            args.value().unwrap_or_default(),
            gas_limit,
            &fee,
            &args,
        );
        self.observe(chain_id, &args, &tx);

        Ok((tx, nonce))
    }

    /// Bind a 65 byte signature to `tx` for `chain_id`
    pub fn add_signature_to_transaction(
        &self,
        chain_id: u64,
        tx: UnsignedTransaction,
        sig: &[u8],
    ) -> TransactorResult<SignedTransaction> {
        if sig.len() != VALID_SIGNATURE_SIZE {
            return Err(TransactorError::InvalidSignatureSize(sig.len()));
        }

        SignedTransaction::from_parts(tx, chain_id, sig)
    }

    /// Rebuild the transaction an external signer signed and attach its signature.
    ///
    /// The arguments are taken as given; the nonce must be the one the network
    /// expects next.
    pub async fn build_transaction_with_signature(
        &self,
        chain_id: u64,
        args: &SendArgs,
        sig: &[u8],
    ) -> TransactorResult<SignedTransaction> {
        let args = args.validate()?;

        if sig.len() != VALID_SIGNATURE_SIZE {
            return Err(TransactorError::InvalidSignatureSize(sig.len()));
        }

        let tx = builder::build_from_args(&args);
        let expected = self.next_nonce(chain_id, args.from()).await?;
        if tx.nonce() != expected {
            return Err(TransactorError::BadNonce {
                actual: tx.nonce(),
                expected,
            });
        }

        self.observe(chain_id, &args, &tx);
        self.add_signature_to_transaction(chain_id, tx, sig)
    }

    /// Broadcast an already signed transaction and hand it to the tracker
    pub async fn send_transaction_with_signature(
        &self,
        from: Address,
        symbol: &str,
        multi_transaction_id: MultiTransactionId,
        signed: &SignedTransaction,
    ) -> TransactorResult<SendOutcome> {
        let chain_id = signed.chain_id();

        self.client.send_transaction(signed).await?;
        metrics::record_tx_broadcast(chain_id);
        info!(
            "Broadcast {:?} on chain {} (nonce {})",
            signed.hash(),
            chain_id,
            signed.nonce()
        );

        let record = PendingTransaction::from_signed(from, symbol, multi_transaction_id, signed);
        let tracking_error = match self.tracker.store_and_track(&record).await {
            Ok(()) => None,
            Err(e) => {
                metrics::record_tracking_failed(chain_id);
                warn!(
                    "Transaction {:?} was broadcast but could not be tracked: {}",
                    signed.hash(),
                    e
                );
                Some(match e {
                    TransactorError::Tracking(_) => e,
                    other => TransactorError::Tracking(other.to_string()),
                })
            }
        };

        Ok(SendOutcome {
            tx_hash: signed.hash(),
            nonce: signed.nonce(),
            tracking_error,
        })
    }

    /// Forward an opaque, already serialized transaction
    pub async fn send_raw_transaction(&self, raw_tx: &str) -> TransactorResult<()> {
        self.client
            .call_raw("eth_sendRawTransaction", vec![serde_json::json!(raw_tx)])
            .await
    }

    pub async fn next_nonce(&self, chain_id: u64, from: Address) -> TransactorResult<u64> {
        self.nonces.next_nonce(chain_id, from).await
    }

    pub async fn estimate_gas(
        &self,
        from: Address,
        to: Option<Address>,
        value: U256,
        input: Bytes,
    ) -> TransactorResult<u64> {
        self.gas.estimate_gas(from, to, value, input).await
    }

    fn observe(&self, chain_id: u64, args: &ValidatedArgs, tx: &UnsignedTransaction) {
        metrics::record_tx_built(chain_id, tx.kind());
        self.observer.on_built(args, tx);
    }
}
