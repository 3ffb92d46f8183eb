//! rpc-mux agent.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────┐
//!                      │                    AGENT                       │
//!   TCP connection     │  ┌──────────┐   ┌────────────┐                 │
//!   ───────────────────┼─▶│ listener │──▶│ dispatcher │ (protocol byte) │
//!                      │  └──────────┘   └─────┬──────┘                 │
//!                      │                       │ handle(conn)           │
//!                      │                       ▼                        │
//!                      │        ┌──────────────────────────────┐        │
//!                      │        │ handler (active | disabled)  │        │
//!                      │        │   handoff ─▶ MuxListener     │        │
//!                      │        └──────────────┬───────────────┘        │
//!                      │                       │ accept()               │
//!                      │                       ▼                        │
//!                      │               ┌──────────────┐                 │
//!                      │               │  RPC server  │                 │
//!                      │               └──────────────┘                 │
//!                      │                                                │
//!                      │  usage reporter ── gauges ─▶ metrics exporter  │
//!                      └────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use rpc_mux::config::{load_config, validate_config, ConfigError, MuxConfig};
use rpc_mux::lifecycle::{signals, Agent};
use rpc_mux::observability;

#[derive(Parser)]
#[command(name = "rpc-mux")]
#[command(about = "Serve multiplexed protocols on one listening socket", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => load_config(&path)?,
        None => {
            let config = MuxConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };

    observability::logging::init_logging(&config.observability);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        rpc_enabled = config.rpc.enabled,
        datacenter = %config.usage.datacenter,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            observability::metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let agent = Agent::new(config);
    let shutdown = agent.shutdown_handle();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    agent.run().await?;
    Ok(())
}
