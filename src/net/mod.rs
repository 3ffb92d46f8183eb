//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limits)
//!     → dispatcher.rs (read protocol byte, pick handler)
//!     → connection.rs (owned stream + peer address + permit)
//!     → handoff.rs (rendezvous with the protocol server)
//!     → mux_listener.rs (accept() for the protocol server)
//! ```
//!
//! # Design Decisions
//! - One physical socket, many protocols
//! - No buffering between dispatcher and protocol server: a handoff completes
//!   only when the server takes the connection
//! - The connection-limit permit travels with the connection

pub mod connection;
pub mod dispatcher;
pub mod handoff;
pub mod listener;
pub mod mux_listener;

pub use connection::{Connection, ConnectionId};
pub use dispatcher::Dispatcher;
pub use handoff::{handoff, HandoffError, HandoffReceiver, HandoffSender};
pub use listener::{Listener, ListenerError};
pub use mux_listener::MuxListener;
