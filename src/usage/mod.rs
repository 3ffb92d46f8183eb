//! Usage metrics subsystem.
//!
//! # Data Flow
//! ```text
//! ticker (reporting interval)
//!     → reporter.rs (query snapshot, count per namespace)
//!     → store.rs (StateSnapshot: nodes, services)
//!     → emitter.rs (MetricsEmitter: state_nodes, state_services gauges)
//! ```
//!
//! # Design Decisions
//! - Emitter and configuration are injected; no hidden global state
//! - The default namespace is always reported, even at zero
//! - Stopped by the shared shutdown signal, never on its own

pub mod emitter;
pub mod reporter;
pub mod store;

pub use emitter::{GaugeValue, InmemEmitter, MetricsEmitter, RecorderEmitter};
pub use reporter::{ReporterConfig, UsageReporter, DEFAULT_REPORTING_INTERVAL};
pub use store::{MemoryStore, Node, ServiceEntry, StateSnapshot, StoreError, DEFAULT_NAMESPACE};
