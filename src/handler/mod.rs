//! Protocol handlers fed by the dispatcher.
//!
//! # Data Flow
//! ```text
//! Dispatcher (classified connection)
//!     → Handler::handle
//!         Active:   → handoff → MuxListener::accept → Framework accept loop
//!         Disabled: → close + diagnostic event
//!
//! Lifecycle (independent of connection flow):
//!     Handler::run       → Framework::serve (blocks until stopped)
//!     Handler::shutdown  → Framework::stop
//! ```
//!
//! # Design Decisions
//! - Active or disabled is chosen once, at construction, from config
//! - Callers never branch on feature state; both variants expose the same operations
//! - One handler per protocol per process, never recreated
//! - Errors are returned verbatim; restart policy belongs to the caller

use std::net::SocketAddr;

use thiserror::Error;

use crate::net::connection::Connection;
use crate::server::Framework;

pub mod active;
pub mod disabled;

pub use active::ActiveHandler;
pub use disabled::DisabledHandler;

/// Lifecycle state of an [`ActiveHandler`].
///
/// ```text
/// Created → Running → ShuttingDown → Stopped
/// ```
/// There is no way back to `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    /// Built, serve loop not started.
    Created,
    /// Serve loop running.
    Running,
    /// Stop requested while the serve loop is still running.
    ShuttingDown,
    /// Serve loop returned, or shutdown happened before it ever started.
    Stopped,
}

/// Errors surfaced by handler lifecycle operations.
#[derive(Debug, Error)]
pub enum HandlerError<E> {
    /// The framework's serve loop exited abnormally.
    #[error(transparent)]
    Serve(E),

    /// The framework failed to stop.
    #[error(transparent)]
    Stop(E),

    /// `run` was called on a handler that had already been started.
    #[error("handler already started (state: {state:?})")]
    AlreadyStarted { state: HandlerState },
}

/// Handler for one multiplexed protocol, enabled or not.
pub enum Handler<F: Framework> {
    /// Connections go to a live server.
    Active(ActiveHandler<F>),
    /// Connections are closed on arrival.
    Disabled(DisabledHandler),
}

impl<F: Framework> Handler<F> {
    /// Build the handler for a protocol. `addr` is the dispatcher's bound
    /// address. When `enabled` is false the framework is dropped unused.
    pub fn new(enabled: bool, addr: SocketAddr, framework: F) -> Self {
        if enabled {
            Handler::Active(ActiveHandler::new(addr, framework))
        } else {
            tracing::info!(address = %addr, "RPC protocol disabled");
            Handler::Disabled(DisabledHandler::new())
        }
    }

    /// Take ownership of a classified connection.
    pub async fn handle(&self, conn: Connection) {
        match self {
            Handler::Active(h) => h.handle(conn).await,
            Handler::Disabled(h) => h.handle(conn),
        }
    }

    /// Run the serve loop until it stops.
    pub async fn run(&self) -> Result<(), HandlerError<F::Error>> {
        match self {
            Handler::Active(h) => h.run().await,
            Handler::Disabled(h) => h.run(),
        }
    }

    /// Ask the serve loop to stop.
    pub fn shutdown(&self) -> Result<(), HandlerError<F::Error>> {
        match self {
            Handler::Active(h) => h.shutdown(),
            Handler::Disabled(h) => h.shutdown(),
        }
    }

    /// Whether connections are served.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Handler::Active(_))
    }

    /// Lifecycle state, or `None` when the protocol is disabled.
    pub fn state(&self) -> Option<HandlerState> {
        match self {
            Handler::Active(h) => Some(h.state()),
            Handler::Disabled(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RpcConfig;
    use crate::server::RpcServer;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;

    fn addr() -> SocketAddr {
        "127.0.0.1:8300".parse().unwrap()
    }

    #[tokio::test]
    async fn disabled_variant_closes_connections() {
        let handler = Handler::new(false, addr(), RpcServer::new(&RpcConfig::default()));
        assert!(!handler.is_enabled());
        assert_eq!(handler.state(), None);

        let (mut client, server) = tokio::io::duplex(16);
        tokio::time::timeout(
            Duration::from_secs(1),
            handler.handle(Connection::new(server, addr())),
        )
        .await
        .unwrap();

        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
        assert!(handler.run().await.is_ok());
        assert!(handler.shutdown().is_ok());
    }

    #[tokio::test]
    async fn enabled_variant_runs_until_shutdown() {
        let handler = std::sync::Arc::new(Handler::new(
            true,
            addr(),
            RpcServer::new(&RpcConfig::default()),
        ));
        assert!(handler.is_enabled());
        assert_eq!(handler.state(), Some(HandlerState::Created));

        let running = tokio::spawn({
            let handler = handler.clone();
            async move { handler.run().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        handler.shutdown().unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        assert_eq!(handler.state(), Some(HandlerState::Stopped));
    }

    #[test]
    fn already_started_message_names_state() {
        let err: HandlerError<std::io::Error> = HandlerError::AlreadyStarted {
            state: HandlerState::Stopped,
        };
        assert_eq!(err.to_string(), "handler already started (state: Stopped)");
    }
}
