//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Bind listener → Build handler → Start tasks
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop dispatcher → Stop RPC server → Stop reporter
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then listener, then protocol servers
//! - Ordered shutdown: stop accepting, drain, stop background tasks

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{Agent, StartupError};
