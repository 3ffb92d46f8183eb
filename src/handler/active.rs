//! Handler that feeds a live server through a [`MuxListener`].

use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::handler::{HandlerError, HandlerState};
use crate::net::connection::Connection;
use crate::net::handoff::{HandoffError, HandoffSender};
use crate::net::mux_listener::MuxListener;
use crate::observability::metrics;
use crate::server::Framework;

/// Where the handler is in its single-use lifecycle.
enum Phase {
    /// Holds the listener until `run` moves it into the serve loop.
    Idle(MuxListener),
    Serving,
    Draining,
    Finished,
    /// Shut down before `run`; the idle listener was dropped.
    Cancelled,
}

impl Phase {
    fn state(&self) -> HandlerState {
        match self {
            Phase::Idle(_) => HandlerState::Created,
            Phase::Serving => HandlerState::Running,
            Phase::Draining => HandlerState::ShuttingDown,
            Phase::Finished | Phase::Cancelled => HandlerState::Stopped,
        }
    }
}

/// Binds a [`MuxListener`] to a [`Framework`] instance.
///
/// The listener is owned by the serve loop while it runs and dropped when it
/// returns, which closes the handoff: `handle` calls still waiting at that
/// point give up and close their connection instead of blocking forever.
pub struct ActiveHandler<F: Framework> {
    addr: SocketAddr,
    conns: HandoffSender<Connection>,
    phase: Mutex<Phase>,
    framework: F,
}

impl<F: Framework> ActiveHandler<F> {
    /// Create a handler whose listener reports `addr`.
    pub fn new(addr: SocketAddr, framework: F) -> Self {
        let (listener, conns) = MuxListener::new(addr);
        Self {
            addr,
            conns,
            phase: Mutex::new(Phase::Idle(listener)),
            framework,
        }
    }

    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HandlerState {
        self.phase().state()
    }

    /// Hand `conn` to the server's accept loop.
    ///
    /// Waits until the accept loop takes it. There is no timeout; the wait
    /// only ends early if the handler shuts down, in which case `conn` is
    /// closed.
    pub async fn handle(&self, conn: Connection) {
        let id = conn.id();
        let peer_addr = conn.peer_addr();

        match self.conns.put(conn).await {
            Ok(()) => {
                metrics::record_handoff();
                tracing::trace!(connection_id = %id, peer_addr = %peer_addr, "Connection handed off");
            }
            Err(HandoffError::Closed(conn)) => {
                metrics::record_handoff_dropped();
                tracing::warn!(
                    connection_id = %id,
                    peer_addr = %peer_addr,
                    "RPC server is not accepting, closing connection"
                );
                drop(conn);
            }
            Err(HandoffError::Abandoned) => {
                metrics::record_handoff_dropped();
                tracing::warn!(
                    connection_id = %id,
                    peer_addr = %peer_addr,
                    "RPC server stopped before accepting, connection closed"
                );
            }
        }
    }

    /// Run the framework's serve loop and wait for it to end.
    ///
    /// Returns the framework's terminal error unchanged. A handler that was
    /// shut down before it ever ran returns `Ok(())` without serving.
    pub async fn run(&self) -> Result<(), HandlerError<F::Error>> {
        let listener = {
            let mut phase = self.phase();
            match std::mem::replace(&mut *phase, Phase::Serving) {
                Phase::Idle(listener) => listener,
                Phase::Cancelled => {
                    *phase = Phase::Cancelled;
                    tracing::debug!(address = %self.addr, "Handler shut down before run");
                    return Ok(());
                }
                other => {
                    let state = other.state();
                    *phase = other;
                    return Err(HandlerError::AlreadyStarted { state });
                }
            }
        };

        let result = self.framework.serve(listener).await;
        *self.phase() = Phase::Finished;

        match &result {
            Ok(()) => tracing::debug!(address = %self.addr, "Serve loop finished"),
            Err(e) => tracing::error!(address = %self.addr, error = %e, "Serve loop failed"),
        }
        result.map_err(HandlerError::Serve)
    }

    /// Ask the framework to stop accepting and finish in-flight work.
    ///
    /// Meant to be called once. Before `run` this also closes the handoff so
    /// nothing waits on a server that will never start.
    pub fn shutdown(&self) -> Result<(), HandlerError<F::Error>> {
        {
            let mut phase = self.phase();
            match &*phase {
                Phase::Idle(_) => *phase = Phase::Cancelled,
                Phase::Serving => *phase = Phase::Draining,
                Phase::Draining | Phase::Finished | Phase::Cancelled => {}
            }
        }

        tracing::info!(address = %self.addr, "Stopping RPC server");
        self.framework.stop().map_err(HandlerError::Stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use axum::serve::Listener as _;
    use std::future::Future;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    const LONG: Duration = Duration::from_secs(5);

    #[derive(Debug, Clone, PartialEq, thiserror::Error)]
    #[error("stub failure: {0}")]
    struct StubError(&'static str);

    /// Accepts into a channel until stopped, or fails on demand. After a
    /// stop it keeps running for `drain` before returning.
    struct StubFramework {
        serve_error: Option<StubError>,
        drain: Duration,
        stop_error: Option<StubError>,
        stop: Shutdown,
        accepted: mpsc::UnboundedSender<Connection>,
    }

    impl StubFramework {
        fn new() -> (Self, mpsc::UnboundedReceiver<Connection>) {
            let (accepted, rx) = mpsc::unbounded_channel();
            let stub = Self {
                serve_error: None,
                drain: Duration::ZERO,
                stop_error: None,
                stop: Shutdown::new(),
                accepted,
            };
            (stub, rx)
        }
    }

    impl Framework for StubFramework {
        type Error = StubError;

        fn serve(
            &self,
            mut listener: MuxListener,
        ) -> impl Future<Output = Result<(), StubError>> + Send {
            let serve_error = self.serve_error.clone();
            let drain = self.drain;
            let mut stop = self.stop.subscribe();
            let accepted = self.accepted.clone();
            async move {
                if let Some(e) = serve_error {
                    return Err(e);
                }
                loop {
                    tokio::select! {
                        (conn, _) = listener.accept() => {
                            let _ = accepted.send(conn);
                        }
                        _ = stop.recv() => break,
                    }
                }
                tokio::time::sleep(drain).await;
                Ok(())
            }
        }

        fn stop(&self) -> Result<(), StubError> {
            self.stop.trigger();
            match &self.stop_error {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    fn addr() -> SocketAddr {
        "127.0.0.1:8300".parse().unwrap()
    }

    fn duplex_conn() -> (Connection, tokio::io::DuplexStream) {
        let (client, server) = tokio::io::duplex(64);
        (Connection::new(server, "10.1.1.1:4000".parse().unwrap()), client)
    }

    #[tokio::test]
    async fn run_returns_serve_error_verbatim() {
        let (mut stub, _accepted) = StubFramework::new();
        stub.serve_error = Some(StubError("bind exploded"));
        let handler = ActiveHandler::new(addr(), stub);

        let err = handler.run().await.unwrap_err();
        assert!(matches!(err, HandlerError::Serve(StubError("bind exploded"))));
        assert_eq!(err.to_string(), "stub failure: bind exploded");
        assert_eq!(handler.state(), HandlerState::Stopped);
    }

    #[tokio::test]
    async fn shutting_down_until_serve_returns() {
        let (mut stub, _accepted) = StubFramework::new();
        stub.drain = Duration::from_millis(300);
        let handler = Arc::new(ActiveHandler::new(addr(), stub));

        let running = tokio::spawn({
            let handler = Arc::clone(&handler);
            async move { handler.run().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handler.state(), HandlerState::Running);

        handler.shutdown().unwrap();
        assert_eq!(handler.state(), HandlerState::ShuttingDown);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handler.state(), HandlerState::ShuttingDown);
        assert!(!running.is_finished());

        timeout(LONG, running).await.unwrap().unwrap().unwrap();
        assert_eq!(handler.state(), HandlerState::Stopped);
    }

    #[tokio::test]
    async fn shutdown_without_stop_error_is_ok() {
        let (stub, _accepted) = StubFramework::new();
        let handler = ActiveHandler::new(addr(), stub);
        assert!(handler.shutdown().is_ok());
    }

    #[tokio::test]
    async fn shutdown_returns_stop_error() {
        let (mut stub, _accepted) = StubFramework::new();
        stub.stop_error = Some(StubError("stop failed"));
        let handler = ActiveHandler::new(addr(), stub);

        let err = handler.shutdown().unwrap_err();
        assert!(matches!(err, HandlerError::Stop(StubError("stop failed"))));
    }

    #[tokio::test]
    async fn lifecycle_walks_state_machine() {
        let (stub, _accepted) = StubFramework::new();
        let handler = Arc::new(ActiveHandler::new(addr(), stub));
        assert_eq!(handler.state(), HandlerState::Created);

        let running = tokio::spawn({
            let handler = handler.clone();
            async move { handler.run().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handler.state(), HandlerState::Running);

        handler.shutdown().unwrap();
        assert!(timeout(LONG, running).await.unwrap().unwrap().is_ok());
        assert_eq!(handler.state(), HandlerState::Stopped);

        let again = handler.run().await.unwrap_err();
        assert!(matches!(
            again,
            HandlerError::AlreadyStarted {
                state: HandlerState::Stopped
            }
        ));
    }

    #[tokio::test]
    async fn handled_connections_reach_accept_loop_in_order() {
        let (stub, mut accepted) = StubFramework::new();
        let handler = Arc::new(ActiveHandler::new(addr(), stub));
        let running = tokio::spawn({
            let handler = handler.clone();
            async move { handler.run().await }
        });

        let mut ids = Vec::new();
        let mut clients = Vec::new();
        for _ in 0..4 {
            let (conn, client) = duplex_conn();
            ids.push(conn.id());
            clients.push(client);
            timeout(LONG, handler.handle(conn)).await.unwrap();
        }

        for expected in ids {
            let conn = timeout(LONG, accepted.recv()).await.unwrap().unwrap();
            assert_eq!(conn.id(), expected);
        }

        handler.shutdown().unwrap();
        timeout(LONG, running).await.unwrap().unwrap().unwrap();
    }

    #[tokio::test]
    async fn shutdown_before_run_releases_pending_handle() {
        let (stub, _accepted) = StubFramework::new();
        let handler = Arc::new(ActiveHandler::new(addr(), stub));

        let (conn, mut client) = duplex_conn();
        let pending = tokio::spawn({
            let handler = handler.clone();
            async move { handler.handle(conn).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!pending.is_finished(), "handle returned without a consumer");

        handler.shutdown().unwrap();
        timeout(LONG, pending).await.unwrap().unwrap();

        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);

        // A cancelled handler never serves.
        assert!(timeout(LONG, handler.run()).await.unwrap().is_ok());
        assert_eq!(handler.state(), HandlerState::Stopped);
    }

    #[tokio::test]
    async fn handle_after_stop_closes_connection() {
        let (stub, _accepted) = StubFramework::new();
        let handler = Arc::new(ActiveHandler::new(addr(), stub));
        let running = tokio::spawn({
            let handler = handler.clone();
            async move { handler.run().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        handler.shutdown().unwrap();
        timeout(LONG, running).await.unwrap().unwrap().unwrap();

        let (conn, mut client) = duplex_conn();
        timeout(LONG, handler.handle(conn)).await.unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
    }
}
