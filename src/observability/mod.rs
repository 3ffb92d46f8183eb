//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (connection_id, peer_addr) on every connection event
//! - Metrics are cheap (atomic increments)
//! - Gauges for usage reporting go through an injected emitter, see `usage`

pub mod logging;
pub mod metrics;
