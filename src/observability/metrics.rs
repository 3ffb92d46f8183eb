//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the Prometheus exporter once at startup
//! - Define the counters recorded along the connection path
//!
//! # Metrics
//! - `rpc_handoffs_total` (counter): connections taken by the RPC accept loop
//! - `rpc_handoffs_dropped_total` (counter): connections closed because the RPC server stopped
//! - `rpc_disabled_connections_total` (counter): connections closed because RPC is disabled
//! - `dispatcher_connections_total` (counter): classified connections, by protocol
//! - `state_nodes`, `state_services` (gauges): emitted by the usage reporter

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the global recorder with a Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_handoff() {
    counter!("rpc_handoffs_total").increment(1);
}

pub fn record_handoff_dropped() {
    counter!("rpc_handoffs_dropped_total").increment(1);
}

pub fn record_disabled_connection() {
    counter!("rpc_disabled_connections_total").increment(1);
}

pub fn record_dispatched(protocol: &'static str) {
    counter!("dispatcher_connections_total", "protocol" => protocol).increment(1);
}
