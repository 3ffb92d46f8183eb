//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so a minimal (even empty) file is valid.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the multiplexing agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MuxConfig {
    /// Physical listener shared by every protocol.
    pub listener: ListenerConfig,

    /// Multiplexed RPC protocol.
    pub rpc: RpcConfig,

    /// Periodic usage gauges.
    pub usage: UsageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8300").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// How long the dispatcher waits for a connection's first byte.
    pub classify_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8300".to_string(),
            max_connections: 10_000,
            classify_timeout_secs: 10,
        }
    }
}

/// RPC protocol configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Serve the protocol. When false, its connections are closed on arrival.
    pub enabled: bool,

    /// First byte that marks a connection as belonging to this protocol.
    pub protocol_byte: u8,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            protocol_byte: 8,
            request_timeout_secs: 30,
        }
    }
}

/// Usage metrics reporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UsageConfig {
    /// Run the reporter.
    pub enabled: bool,

    /// Datacenter label attached to every gauge.
    pub datacenter: String,

    /// Reporting interval in seconds.
    pub reporting_interval_secs: u64,

    /// Extra static labels attached to every gauge.
    pub labels: BTreeMap<String, String>,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            datacenter: "dc1".to_string(),
            reporting_interval_secs: 60,
            labels: BTreeMap::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
