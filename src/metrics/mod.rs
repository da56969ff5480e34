//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Built and broadcast transactions
//! - Failures per pipeline stage
//! - Tracking failures after broadcast
//! - End-to-end send latency

use crate::error::{TransactorError, TransactorResult};

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    pub static ref TX_BUILT: CounterVec = register_counter_vec!(
        "transactor_transactions_built_total",
        "Total transactions built by fee model",
        &["chain_id", "kind"]
    ).unwrap();

    pub static ref TX_BROADCAST: CounterVec = register_counter_vec!(
        "transactor_transactions_broadcast_total",
        "Total transactions accepted by the node",
        &["chain_id"]
    ).unwrap();

    pub static ref TX_FAILED: CounterVec = register_counter_vec!(
        "transactor_transactions_failed_total",
        "Total transactions that were never broadcast, by stage",
        &["chain_id", "stage"]
    ).unwrap();

    pub static ref TX_TRACKING_FAILED: CounterVec = register_counter_vec!(
        "transactor_tracking_failures_total",
        "Total broadcast transactions the tracker failed to record",
        &["chain_id"]
    ).unwrap();

    pub static ref TX_SEND_LATENCY: HistogramVec = register_histogram_vec!(
        "transactor_send_latency_seconds",
        "Time from send request to broadcast acknowledgement",
        &["chain_id"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();
}

/// Render every registered metric in the text exposition format
pub fn gather() -> TransactorResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TransactorError::Internal(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TransactorError::Internal(e.to_string()))
}

// Helper functions to record metrics

pub fn record_tx_built(chain_id: u64, kind: &str) {
    TX_BUILT
        .with_label_values(&[&chain_id.to_string(), kind])
        .inc();
}

pub fn record_tx_broadcast(chain_id: u64) {
    TX_BROADCAST
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_tx_failed(chain_id: u64, err: &TransactorError) {
    TX_FAILED
        .with_label_values(&[&chain_id.to_string(), err.stage()])
        .inc();
}

pub fn record_tracking_failed(chain_id: u64) {
    TX_TRACKING_FAILED
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_send_latency(chain_id: u64, latency_secs: f64) {
    TX_SEND_LATENCY
        .with_label_values(&[&chain_id.to_string()])
        .observe(latency_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_renders_recorded_metrics() {
        record_tx_broadcast(99_001);
        record_tx_failed(99_001, &TransactorError::Sign("hsm offline".to_string()));

        let text = gather().unwrap();
        assert!(text.contains("transactor_transactions_broadcast_total"));
        assert!(text.contains("stage=\"sign\""));
    }
}
