//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind the shared listener
//! - Build the RPC handler (active or disabled) once, from config
//! - Start background tasks (dispatcher, usage reporter)
//! - Tear everything down in order on shutdown
//!
//! # Design Decisions
//! - Fail fast: a serve loop that exits on its own is fatal
//! - Shutdown order: stop accepting, stop the RPC server, stop the reporter

use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::MuxConfig;
use crate::handler::{Handler, HandlerError};
use crate::lifecycle::Shutdown;
use crate::net::dispatcher::Dispatcher;
use crate::net::listener::{Listener, ListenerError};
use crate::server::{Framework, RpcServer};
use crate::usage::{MemoryStore, MetricsEmitter, RecorderEmitter, ReporterConfig, UsageReporter};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("listener: {0}")]
    Listener(#[from] ListenerError),

    #[error("RPC server: {0}")]
    Rpc(#[from] HandlerError<io::Error>),

    #[error("RPC server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Owns the process-lifetime pieces built from one [`MuxConfig`].
pub struct Agent {
    config: MuxConfig,
    catalog: Arc<MemoryStore>,
    emitter: Arc<dyn MetricsEmitter>,
    shutdown: Shutdown,
}

impl Agent {
    pub fn new(config: MuxConfig) -> Self {
        Self {
            config,
            catalog: Arc::new(MemoryStore::new()),
            emitter: Arc::new(RecorderEmitter),
            shutdown: Shutdown::new(),
        }
    }

    /// Send usage gauges to `emitter` instead of the global recorder.
    pub fn with_emitter(mut self, emitter: Arc<dyn MetricsEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Catalog polled by the usage reporter.
    pub fn catalog(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.catalog)
    }

    /// Handle that stops [`Agent::run`] when triggered.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Run with the axum RPC server until the shutdown handle fires or the
    /// server fails.
    pub async fn run(self) -> Result<(), StartupError> {
        let server = RpcServer::new(&self.config.rpc);
        self.run_with(server).await
    }

    /// Run with `framework` serving handed-off RPC connections.
    ///
    /// On shutdown the dispatcher stops accepting first, then the RPC server
    /// is stopped and drained, then the usage reporter stops.
    pub async fn run_with<F>(self, framework: F) -> Result<(), StartupError>
    where
        F: Framework<Error = io::Error>,
    {
        let listener = Listener::bind(&self.config.listener).await?;
        let addr = listener.local_addr().map_err(ListenerError::Bind)?;

        let rpc = Arc::new(Handler::new(self.config.rpc.enabled, addr, framework));

        let accepting = Shutdown::new();
        let dispatcher = Dispatcher::new(
            listener,
            Arc::clone(&rpc),
            self.config.rpc.protocol_byte,
            Duration::from_secs(self.config.listener.classify_timeout_secs),
        );
        let dispatching = tokio::spawn(dispatcher.run(accepting.subscribe()));

        let reporting = Shutdown::new();
        let reporter = self.config.usage.enabled.then(|| {
            let reporter = UsageReporter::new(
                Arc::clone(&self.catalog),
                Arc::clone(&self.emitter),
                ReporterConfig::from_usage(&self.config.usage),
            );
            tokio::spawn(reporter.run(reporting.subscribe()))
        });

        let mut serving = tokio::spawn({
            let rpc = Arc::clone(&rpc);
            async move { rpc.run().await }
        });

        tracing::info!(address = %addr, rpc_enabled = rpc.is_enabled(), "Agent started");

        let mut stop = self.shutdown.subscribe();
        let early_exit = tokio::select! {
            served = &mut serving => Some(served),
            _ = stop.recv() => None,
        };

        let served = match early_exit {
            Some(served) if rpc.is_enabled() => {
                tracing::error!("RPC server exited before shutdown was requested");
                accepting.trigger();
                let _ = dispatching.await;
                served
            }
            // A disabled handler's run returns immediately; that is not a failure.
            Some(served) => {
                stop.recv().await;
                tracing::info!("Shutting down");
                accepting.trigger();
                let _ = dispatching.await;
                served
            }
            None => {
                tracing::info!("Shutting down");
                accepting.trigger();
                let _ = dispatching.await;
                match rpc.shutdown() {
                    Ok(()) => serving.await,
                    Err(e) => Ok(Err(e)),
                }
            }
        };

        reporting.trigger();
        if let Some(reporter) = reporter {
            let _ = reporter.await;
        }

        served??;
        tracing::info!("Shutdown complete");
        Ok(())
    }
}
