//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` wins over the configured level when set

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Install the global subscriber. A second call is ignored.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "rpc_mux={level},tower_http={level}",
            level = config.log_level
        ))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
