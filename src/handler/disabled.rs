//! Handler used when the RPC protocol is turned off.

use crate::handler::HandlerError;
use crate::net::connection::Connection;
use crate::observability::metrics;

/// Closes every connection it is given. Lifecycle calls succeed and do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledHandler;

impl DisabledHandler {
    pub fn new() -> Self {
        Self
    }

    /// Close `conn` right away. Never waits.
    pub fn handle(&self, conn: Connection) {
        tracing::error!(
            connection_id = %conn.id(),
            peer_addr = %conn.peer_addr(),
            "RPC connection opened but RPC is disabled, closing"
        );
        metrics::record_disabled_connection();
        drop(conn);
    }

    pub fn run<E>(&self) -> Result<(), HandlerError<E>> {
        Ok(())
    }

    pub fn shutdown<E>(&self) -> Result<(), HandlerError<E>> {
        Ok(())
    }
}
