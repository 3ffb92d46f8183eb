//! First-byte protocol classification on the shared socket.
//!
//! Every client opens with one byte naming the protocol it speaks. The
//! dispatcher reads that byte and gives the rest of the stream to the matching
//! handler. Only the RPC protocol is wired here; anything else is closed.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;

use crate::handler::Handler;
use crate::lifecycle::ShutdownSignal;
use crate::net::connection::Connection;
use crate::net::listener::{Listener, ListenerError};
use crate::observability::metrics;
use crate::server::Framework;

const ACCEPT_BACKOFF_BASE_MS: u64 = 5;
const ACCEPT_BACKOFF_MAX_MS: u64 = 1000;

/// Delay before retrying after `failures` consecutive accept errors.
fn accept_backoff(failures: u32) -> Duration {
    if failures == 0 {
        return Duration::ZERO;
    }
    let exponential = 2u64.saturating_pow(failures - 1);
    Duration::from_millis(
        ACCEPT_BACKOFF_BASE_MS
            .saturating_mul(exponential)
            .min(ACCEPT_BACKOFF_MAX_MS),
    )
}

pub struct Dispatcher<F: Framework> {
    listener: Listener,
    rpc: Arc<Handler<F>>,
    protocol_byte: u8,
    classify_timeout: Duration,
}

impl<F: Framework> Dispatcher<F> {
    pub fn new(
        listener: Listener,
        rpc: Arc<Handler<F>>,
        protocol_byte: u8,
        classify_timeout: Duration,
    ) -> Self {
        Self {
            listener,
            rpc,
            protocol_byte,
            classify_timeout,
        }
    }

    /// Accept until `shutdown` fires. Each connection is classified on its
    /// own task, so a slow client or a busy handler does not hold up accept.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        let mut failures = 0u32;
        loop {
            let conn = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(ListenerError::Closed) => break,
                    Err(e) => {
                        // Errors like EMFILE repeat until something closes.
                        failures = failures.saturating_add(1);
                        let delay = accept_backoff(failures);
                        tracing::warn!(error = %e, retry_in = ?delay, "Accept failed");
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => continue,
                            _ = shutdown.recv() => break,
                        }
                    }
                },
                _ = shutdown.recv() => break,
            };
            failures = 0;

            let rpc = Arc::clone(&self.rpc);
            let protocol_byte = self.protocol_byte;
            let classify_timeout = self.classify_timeout;
            tokio::spawn(async move {
                classify(conn, rpc, protocol_byte, classify_timeout).await;
            });
        }

        tracing::info!("Dispatcher stopped accepting");
    }
}

async fn classify<F: Framework>(
    mut conn: Connection,
    rpc: Arc<Handler<F>>,
    protocol_byte: u8,
    classify_timeout: Duration,
) {
    let mut first = [0u8; 1];
    match tokio::time::timeout(classify_timeout, conn.read_exact(&mut first)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            tracing::debug!(connection_id = %conn.id(), error = %e, "Failed to read protocol byte");
            return;
        }
        Err(_) => {
            tracing::debug!(connection_id = %conn.id(), "Timed out waiting for protocol byte");
            return;
        }
    }

    if first[0] == protocol_byte {
        metrics::record_dispatched("rpc");
        rpc.handle(conn).await;
    } else {
        metrics::record_dispatched("unknown");
        tracing::warn!(
            connection_id = %conn.id(),
            peer_addr = %conn.peer_addr(),
            protocol_byte = first[0],
            "Unrecognized protocol, closing connection"
        );
    }
}
