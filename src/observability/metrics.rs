//! Metrics collection and exposition.
//!
//! # Metrics
//! - `indexer_bootstrap_index_sync_total` (counter): by `outcome`
//! - `indexer_bootstrap_registration_total` (counter): by `outcome`
//! - `indexer_bootstrap_ready` (gauge): 1 once the service reached Ready
//! - `indexer_auth_decisions_total` (counter): by `scheme`, `outcome`
//!
//! Recording without an installed exporter is a no-op.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint. Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_index_sync(outcome: &'static str) {
    counter!("indexer_bootstrap_index_sync_total", "outcome" => outcome).increment(1);
}

pub fn record_registration(outcome: &'static str) {
    counter!("indexer_bootstrap_registration_total", "outcome" => outcome).increment(1);
}

pub fn record_ready() {
    gauge!("indexer_bootstrap_ready").set(1.0);
}

pub fn record_auth_decision(scheme: &str, accepted: bool) {
    let outcome = if accepted { "accepted" } else { "rejected" };
    counter!(
        "indexer_auth_decisions_total",
        "scheme" => scheme.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
