//! Chain provider with multi-RPC support and automatic failover

use super::{CallRequest, LedgerClient};
use crate::config::ChainConfig;
use crate::error::{TransactorError, TransactorResult};
use crate::types::SignedTransaction;

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Multi-provider wrapper with automatic failover
pub struct ChainProvider {
    /// Chain id the providers are expected to serve
    chain_id: u64,
    /// Display name from configuration
    name: String,
    /// HTTP providers (multiple for failover)
    http_providers: Vec<Provider<Http>>,
    /// Current active provider index
    current_provider: AtomicUsize,
}

impl ChainProvider {
    /// Create a new chain provider
    pub fn new(chain_id: u64, config: &ChainConfig) -> TransactorResult<Self> {
        let mut http_providers = Vec::new();

        for url in &config.rpc_urls {
            match Provider::<Http>::try_from(url.as_str()) {
                Ok(provider) => {
                    let provider = provider.interval(Duration::from_millis(100));
                    http_providers.push(provider);
                    debug!("Added HTTP provider for chain {}: {}", chain_id, url);
                }
                Err(e) => {
                    warn!("Failed to create provider for {}: {}", url, e);
                }
            }
        }

        if http_providers.is_empty() {
            return Err(TransactorError::ChainConnection {
                chain_id,
                message: "No valid RPC providers".to_string(),
            });
        }

        Ok(Self {
            chain_id,
            name: config.name.clone(),
            http_providers,
            current_provider: AtomicUsize::new(0),
        })
    }

    /// Get the active HTTP provider
    pub fn http(&self) -> &Provider<Http> {
        let idx = self.current_provider.load(Ordering::Relaxed);
        &self.http_providers[idx % self.http_providers.len()]
    }

    /// Switch to next available provider
    pub fn failover(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.http_providers.len();
        self.current_provider.store(next, Ordering::Relaxed);
        warn!("Chain {} failover to provider {}", self.chain_id, next);
    }

    /// Get chain ID
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Get configured chain name
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl LedgerClient for ChainProvider {
    async fn pending_nonce_at(&self, address: Address) -> TransactorResult<u64> {
        let block = Some(BlockId::Number(BlockNumber::Pending));

        // Read-only lookups fail over across providers
        for _ in 0..self.http_providers.len() {
            match self.http().get_transaction_count(address, block).await {
                Ok(nonce) => return Ok(nonce.as_u64()),
                Err(e) => {
                    warn!(
                        "Failed to get pending nonce from chain {}: {}",
                        self.chain_id, e
                    );
                    self.failover();
                }
            }
        }

        Err(TransactorError::Nonce {
            chain_id: self.chain_id,
            message: "All providers failed to return a pending nonce".to_string(),
        })
    }

    async fn estimate_gas(&self, call: &CallRequest) -> TransactorResult<u64> {
        let gas = self
            .http()
            .estimate_gas(&call.to_typed(), None)
            .await
            .map_err(|e| TransactorError::GasEstimation(e.to_string()))?;

        Ok(gas.as_u64())
    }

    async fn suggest_gas_price(&self) -> TransactorResult<U256> {
        self.http()
            .get_gas_price()
            .await
            .map_err(|e| TransactorError::PriceSuggestion(e.to_string()))
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> TransactorResult<()> {
        // Broadcast never fails over to another provider
        self.http()
            .send_raw_transaction(tx.raw())
            .await
            .map_err(|e| TransactorError::Broadcast(e.to_string()))?;

        debug!("Broadcast {:?} on chain {}", tx.hash(), self.chain_id);
        Ok(())
    }

    async fn call_raw(&self, method: &str, params: Vec<serde_json::Value>) -> TransactorResult<()> {
        let _: serde_json::Value = self
            .http()
            .request(method, params)
            .await
            .map_err(|e| TransactorError::Broadcast(format!("{} failed: {}", method, e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_config(urls: &[&str]) -> ChainConfig {
        ChainConfig {
            name: "local".to_string(),
            rpc_urls: urls.iter().map(|u| u.to_string()).collect(),
        }
    }

    #[test]
    fn test_requires_a_valid_rpc_url() {
        let err = ChainProvider::new(1, &chain_config(&["not a url"])).err().unwrap();
        assert!(matches!(
            err,
            TransactorError::ChainConnection { chain_id: 1, .. }
        ));
    }

    #[test]
    fn test_failover_rotates_providers() {
        let provider = ChainProvider::new(
            5,
            &chain_config(&["http://127.0.0.1:8545", "http://127.0.0.1:8546"]),
        )
        .unwrap();

        assert_eq!(provider.current_provider.load(Ordering::Relaxed), 0);
        provider.failover();
        assert_eq!(provider.current_provider.load(Ordering::Relaxed), 1);
        provider.failover();
        assert_eq!(provider.current_provider.load(Ordering::Relaxed), 0);
        assert_eq!(provider.chain_id(), 5);
        assert_eq!(provider.name(), "local");
    }
}
