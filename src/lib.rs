//! Protocol multiplexing on a single listening socket.
//!
//! An outer dispatcher owns the physical socket and classifies each
//! connection; protocol servers that only know how to accept from a listener
//! are fed through a [`net::MuxListener`] that has no socket of its own.

// Core subsystems
pub mod config;
pub mod handler;
pub mod net;
pub mod server;

// Background reporting
pub mod usage;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::MuxConfig;
pub use handler::{Handler, HandlerError, HandlerState};
pub use lifecycle::{Agent, Shutdown};
pub use net::{Connection, MuxListener};
pub use server::{Framework, RpcServer};
