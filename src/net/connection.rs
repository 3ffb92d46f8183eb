//! Accepted connections as they travel from the dispatcher to a protocol server.
//!
//! # Responsibilities
//! - Wrap an already-accepted byte stream with its peer address
//! - Generate unique connection IDs for tracing
//! - Carry the connection-limit permit for the lifetime of the stream
//!
//! A [`Connection`] is owned by exactly one party at a time. Dropping it
//! closes the underlying stream and releases its permit.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::net::listener::ConnectionPermit;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Any bidirectional byte stream that can back a [`Connection`].
pub trait Io: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T> Io for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

/// An opaque, already-accepted bidirectional stream plus its remote address.
pub struct Connection {
    id: ConnectionId,
    peer_addr: SocketAddr,
    io: Box<dyn Io>,
    _permit: Option<ConnectionPermit>,
}

impl Connection {
    /// Wrap a stream accepted from `peer_addr`.
    pub fn new<T: Io>(io: T, peer_addr: SocketAddr) -> Self {
        Self {
            id: ConnectionId::new(),
            peer_addr,
            io: Box::new(io),
            _permit: None,
        }
    }

    /// Attach a connection-limit permit, held until this connection is dropped.
    pub fn with_permit(mut self, permit: ConnectionPermit) -> Self {
        self._permit = Some(permit);
        self
    }

    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remote address of the peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .finish_non_exhaustive()
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_read(cx, buf)
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.io).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_shutdown(cx)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.io).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.io.is_write_vectored()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        tracing::trace!(connection_id = %self.id, peer_addr = %self.peer_addr, "Connection closed");
    }
}
