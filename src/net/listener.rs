//! Physical TCP listener shared by every multiplexed protocol.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Enforce max_connections limit via semaphore
//!
//! The permit travels inside the accepted [`Connection`], so the limit holds
//! until whichever protocol server ends up owning the stream drops it.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::config::ListenerConfig;
use crate::net::connection::Connection;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind(std::io::Error),
    /// Failed to accept connection.
    Accept(std::io::Error),
    /// The connection limit semaphore was closed.
    Closed,
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
            ListenerError::Accept(e) => write!(f, "Failed to accept: {}", e),
            ListenerError::Closed => write!(f, "Connection limit closed"),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind(e) | ListenerError::Accept(e) => Some(e),
            ListenerError::Closed => None,
        }
    }
}

/// A bounded TCP listener that limits concurrent connections.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is reached,
/// new connections will wait until a slot becomes available.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Semaphore to limit concurrent connections.
    connection_limit: Arc<Semaphore>,
    /// Configured maximum connections.
    max_connections: usize,
}

impl Listener {
    /// Bind to the configured address with connection limits.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
            ListenerError::Bind(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;

        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;

        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

        tracing::info!(
            address = %local_addr,
            max_connections = config.max_connections,
            "Listener bound"
        );

        Ok(Self {
            inner: listener,
            connection_limit: Arc::new(Semaphore::new(config.max_connections)),
            max_connections: config.max_connections,
        })
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// This will wait if the connection limit has been reached. The returned
    /// connection holds its slot until it is dropped.
    pub async fn accept(&self) -> Result<Connection, ListenerError> {
        // Acquire permit first (backpressure)
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok(Connection::new(stream, addr).with_permit(ConnectionPermit { _permit: permit }))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Get current available connection slots.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    /// Get configured maximum connections.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// A permit representing a connection slot.
///
/// When dropped, the connection slot is released back to the pool.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
