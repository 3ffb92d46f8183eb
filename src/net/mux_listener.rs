//! A listener with no socket of its own.
//!
//! [`MuxListener`] satisfies the [`axum::serve::Listener`] contract for a
//! protocol server that shares the physical socket with other protocols. The
//! outer dispatcher owns that socket; it pushes each connection it classifies
//! for this protocol through a [`HandoffSender`], and `accept` hands them to
//! the server in the same order.

use std::io;
use std::net::SocketAddr;

use crate::net::connection::Connection;
use crate::net::handoff::{handoff, HandoffReceiver, HandoffSender};

/// Listener fed by connections pushed from the dispatcher.
pub struct MuxListener {
    addr: SocketAddr,
    conns: HandoffReceiver<Connection>,
}

impl MuxListener {
    /// Create a listener reporting `addr`, the dispatcher's real bound
    /// address, plus the sender the dispatcher pushes connections into.
    pub fn new(addr: SocketAddr) -> (Self, HandoffSender<Connection>) {
        let (tx, rx) = handoff();
        (Self { addr, conns: rx }, tx)
    }

    /// Address recorded at construction. Display only; nothing binds to it.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Does nothing. Sockets and connections belong to the dispatcher, so
    /// closing here must not stop `accept` or fail anything pending on it.
    pub fn close(&self) -> io::Result<()> {
        tracing::trace!(address = %self.addr, "Ignoring close on multiplexed listener");
        Ok(())
    }
}

impl axum::serve::Listener for MuxListener {
    type Io = Connection;
    type Addr = SocketAddr;

    /// Wait for the dispatcher to hand off a connection. Never fails.
    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        let conn = self.conns.take().await;
        let peer_addr = conn.peer_addr();
        tracing::trace!(connection_id = %conn.id(), peer_addr = %peer_addr, "Accepted handed-off connection");
        (conn, peer_addr)
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        Ok(self.addr)
    }
}
