//! Protocol server subsystem.
//!
//! # Data Flow
//! ```text
//! MuxListener (handed-off connections)
//!     → Framework::serve (accept loop owned by the framework)
//!     → rpc.rs (axum router, middleware)
//!     → status.rs (handlers)
//! ```
//!
//! # Design Decisions
//! - Handlers only depend on [`Framework`], never on axum directly
//! - Stopping is a request; `serve` returns once in-flight work is finished

use std::future::Future;

use crate::net::mux_listener::MuxListener;

pub mod rpc;
pub mod status;

pub use rpc::RpcServer;

/// A server that accepts from a listener and can be asked to stop.
pub trait Framework: Send + Sync + 'static {
    /// Terminal error of the serve loop or of a stop request.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run the accept loop on `listener` until stopped or failed.
    fn serve(&self, listener: MuxListener) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Stop accepting and let in-flight work finish.
    fn stop(&self) -> Result<(), Self::Error>;
}
