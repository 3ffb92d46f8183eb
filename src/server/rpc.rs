//! RPC server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (tracing, request timeout)
//! - Serve the router on a [`MuxListener`]
//! - Graceful stop via the shared [`Shutdown`] trigger
//!
//! No TLS here: the physical listener in front of the dispatcher already
//! terminates it for every multiplexed protocol.

use std::future::Future;
use std::io;
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::RpcConfig;
use crate::lifecycle::Shutdown;
use crate::net::mux_listener::MuxListener;
use crate::server::status;
use crate::server::Framework;

/// Axum-backed server for the multiplexed RPC protocol.
pub struct RpcServer {
    router: Router,
    shutdown: Shutdown,
}

impl RpcServer {
    /// Create a new RPC server with the given configuration.
    pub fn new(config: &RpcConfig) -> Self {
        Self {
            router: Self::build_router(config),
            shutdown: Shutdown::new(),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RpcConfig) -> Router {
        Router::new()
            .route("/v1/status", get(status::get_status))
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// The router served on each handed-off connection.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

impl Framework for RpcServer {
    type Error = io::Error;

    fn serve(&self, listener: MuxListener) -> impl Future<Output = io::Result<()>> + Send {
        let router = self.router.clone();
        let mut stop = self.shutdown.subscribe();
        let addr = listener.addr();

        async move {
            tracing::info!(address = %addr, "RPC server starting");

            axum::serve(listener, router)
                .with_graceful_shutdown(async move { stop.recv().await })
                .await?;

            tracing::info!(address = %addr, "RPC server stopped");
            Ok(())
        }
    }

    fn stop(&self) -> io::Result<()> {
        self.shutdown.trigger();
        Ok(())
    }
}
