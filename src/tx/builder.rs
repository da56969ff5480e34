//! Unsigned transaction construction

use crate::chain::GasPrice;
use crate::types::{DynamicFeeTx, FeeMode, LegacyTx, UnsignedTransaction, ValidatedArgs};

use ethers::types::U256;
use ethers::utils::get_contract_address;
use tracing::info;

/// Called with every freshly built transaction. Cannot alter it.
pub trait BuildObserver: Send + Sync {
    fn on_built(&self, args: &ValidatedArgs, tx: &UnsignedTransaction);
}

/// Default observer: one structured log line per transaction
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl BuildObserver for LoggingObserver {
    fn on_built(&self, args: &ValidatedArgs, tx: &UnsignedTransaction) {
        let max_cost = tx.fee().calculate_cost(tx.gas_limit());
        let kind = tx.kind();

        match tx.to() {
            Some(to) => info!(
                from = ?args.from(),
                to = ?to,
                nonce = tx.nonce(),
                gas = tx.gas_limit(),
                value = %tx.value(),
                max_cost = %max_cost,
                kind,
                "Built transfer transaction"
            ),
            None => info!(
                from = ?args.from(),
                contract = ?get_contract_address(args.from(), tx.nonce()),
                nonce = tx.nonce(),
                gas = tx.gas_limit(),
                max_cost = %max_cost,
                kind,
                "Built contract creation transaction"
            ),
        }
    }
}

/// Assemble an unsigned transaction. Pure: same inputs, same transaction.
///
/// The variant follows `fee`; a missing recipient creates a contract.
pub fn build(
    nonce: u64,
    value: U256,
    gas_limit: u64,
    fee: &GasPrice,
    args: &ValidatedArgs,
) -> UnsignedTransaction {
    let to = args.to();
    let input = args.input().clone();

    match fee {
        GasPrice::Legacy(gas_price) => UnsignedTransaction::Legacy(LegacyTx {
            nonce,
            gas_price: *gas_price,
            gas_limit,
            to,
            value,
            input,
        }),
        GasPrice::DynamicFee {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => UnsignedTransaction::DynamicFee(DynamicFeeTx {
            nonce,
            gas_tip_cap: *max_priority_fee_per_gas,
            gas_fee_cap: *max_fee_per_gas,
            gas_limit,
            to,
            value,
            input,
        }),
    }
}

/// Build exactly what the arguments say, without consulting the network.
///
/// Unset nonce, gas, value and legacy price are zero.
pub fn build_from_args(args: &ValidatedArgs) -> UnsignedTransaction {
    let fee = match args.fee() {
        FeeMode::Legacy { gas_price } => GasPrice::Legacy(gas_price.unwrap_or_default()),
        FeeMode::DynamicFee {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => GasPrice::DynamicFee {
            max_fee_per_gas: *max_fee_per_gas,
            max_priority_fee_per_gas: *max_priority_fee_per_gas,
        },
    };

    build(
        args.nonce().unwrap_or_default(),
        args.value().unwrap_or_default(),
        args.gas().unwrap_or_default(),
        &fee,
        args,
    )
}
