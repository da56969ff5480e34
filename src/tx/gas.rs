//! Gas limit and price resolution for both fee models

use crate::chain::{CallRequest, GasPrice, LedgerClient};
use crate::error::{TransactorError, TransactorResult};
use crate::types::{FeeMode, ValidatedArgs};

use ethers::types::{Address, Bytes, U256};
use std::sync::Arc;
use tracing::debug;

/// Fills in the gas limit and fee parameters the caller left out
pub struct GasResolver {
    client: Arc<dyn LedgerClient>,
}

impl GasResolver {
    pub fn new(client: Arc<dyn LedgerClient>) -> Self {
        Self { client }
    }

    /// Resolve gas limit and fee parameters.
    ///
    /// A legacy price is only suggested when the caller gave none; dynamic fee
    /// transactions never get one.
    pub async fn resolve_gas_and_price(
        &self,
        args: &ValidatedArgs,
    ) -> TransactorResult<(u64, GasPrice)> {
        let fee = match args.fee() {
            FeeMode::DynamicFee {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => GasPrice::DynamicFee {
                max_fee_per_gas: *max_fee_per_gas,
                max_priority_fee_per_gas: *max_priority_fee_per_gas,
            },
            FeeMode::Legacy {
                gas_price: Some(price),
            } => GasPrice::Legacy(*price),
            FeeMode::Legacy { gas_price: None } => {
                let price = self.client.suggest_gas_price().await.map_err(|e| {
                    TransactorError::PriceSuggestion(format!(
                        "failed to suggest gas price: {}",
                        cause(e)
                    ))
                })?;
                GasPrice::Legacy(price)
            }
        };

        let gas_limit = match args.gas() {
            Some(gas) => gas,
            None => {
                let call = CallRequest {
                    from: args.from(),
                    to: args.to(),
                    value: args.value().unwrap_or_default(),
                    data: args.input().clone(),
                    fee: fee.clone(),
                };
                self.client.estimate_gas(&call).await.map_err(|e| {
                    TransactorError::GasEstimation(format!("failed to estimate gas: {}", cause(e)))
                })?
            }
        };

        debug!("Resolved gas {} with {:?}", gas_limit, fee);
        Ok((gas_limit, fee))
    }

    /// Plain estimate without fee parameters
    pub async fn estimate_gas(
        &self,
        from: Address,
        to: Option<Address>,
        value: U256,
        input: Bytes,
    ) -> TransactorResult<u64> {
        let call = CallRequest {
            from,
            to,
            value,
            data: input,
            fee: GasPrice::Legacy(U256::zero()),
        };
        self.client.estimate_gas(&call).await
    }
}

/// Message of a client error without its variant prefix
fn cause(err: TransactorError) -> String {
    match err {
        TransactorError::GasEstimation(msg) | TransactorError::PriceSuggestion(msg) => msg,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockLedgerClient;
    use crate::types::SendArgs;

    fn transfer_args() -> SendArgs {
        SendArgs {
            from: Address::repeat_byte(0xaa),
            to: Some(Address::repeat_byte(0xbb)),
            value: Some(U256::from(1000)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_legacy_defaults_from_network() {
        let mut client = MockLedgerClient::new();
        client
            .expect_suggest_gas_price()
            .times(1)
            .returning(|| Ok(U256::from(10)));
        client
            .expect_estimate_gas()
            .withf(|call| {
                call.fee == GasPrice::Legacy(U256::from(10)) && call.value == U256::from(1000)
            })
            .times(1)
            .returning(|_| Ok(21_000));

        let resolver = GasResolver::new(Arc::new(client));
        let args = transfer_args().validate().unwrap();

        let (gas, price) = resolver.resolve_gas_and_price(&args).await.unwrap();
        assert_eq!(gas, 21_000);
        assert_eq!(price, GasPrice::Legacy(U256::from(10)));
    }

    #[tokio::test]
    async fn test_dynamic_fee_never_suggests_price() {
        let mut client = MockLedgerClient::new();
        client.expect_suggest_gas_price().never();
        client
            .expect_estimate_gas()
            .withf(|call| matches!(call.fee, GasPrice::DynamicFee { .. }))
            .returning(|_| Ok(30_000));

        let args = SendArgs {
            max_fee_per_gas: Some(U256::from(100)),
            max_priority_fee_per_gas: Some(U256::from(2)),
            ..transfer_args()
        }
        .validate()
        .unwrap();

        let (gas, price) = GasResolver::new(Arc::new(client))
            .resolve_gas_and_price(&args)
            .await
            .unwrap();
        assert_eq!(gas, 30_000);
        assert_eq!(
            price,
            GasPrice::DynamicFee {
                max_fee_per_gas: U256::from(100),
                max_priority_fee_per_gas: U256::from(2),
            }
        );
    }

    #[tokio::test]
    async fn test_explicit_values_skip_network() {
        let mut client = MockLedgerClient::new();
        client.expect_suggest_gas_price().never();
        client.expect_estimate_gas().never();

        let args = SendArgs {
            gas: Some(50_000u64.into()),
            gas_price: Some(U256::from(7)),
            ..transfer_args()
        }
        .validate()
        .unwrap();

        let (gas, price) = GasResolver::new(Arc::new(client))
            .resolve_gas_and_price(&args)
            .await
            .unwrap();
        assert_eq!(gas, 50_000);
        assert_eq!(price, GasPrice::Legacy(U256::from(7)));
    }

    #[tokio::test]
    async fn test_errors_name_failed_step() {
        let mut client = MockLedgerClient::new();
        client
            .expect_suggest_gas_price()
            .returning(|| Err(TransactorError::Internal("rpc down".to_string())));

        let err = GasResolver::new(Arc::new(client))
            .resolve_gas_and_price(&transfer_args().validate().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, TransactorError::PriceSuggestion(_)));
        assert!(err.to_string().contains("failed to suggest gas price"));

        let mut client = MockLedgerClient::new();
        client
            .expect_estimate_gas()
            .returning(|_| Err(TransactorError::Internal("execution reverted".to_string())));
        let args = SendArgs {
            gas_price: Some(U256::from(1)),
            ..transfer_args()
        }
        .validate()
        .unwrap();

        let err = GasResolver::new(Arc::new(client))
            .resolve_gas_and_price(&args)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to estimate gas"));

        let mut client = MockLedgerClient::new();
        client
            .expect_estimate_gas()
            .returning(|_| Err(TransactorError::GasEstimation("out of gas".to_string())));
        let err = GasResolver::new(Arc::new(client))
            .resolve_gas_and_price(&args)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Gas estimation error: failed to estimate gas: out of gas"
        );
    }
}
