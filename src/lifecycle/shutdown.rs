//! Shutdown coordination.

use std::sync::Arc;
use tokio::sync::watch;

/// Coordinator for graceful shutdown.
///
/// Long-running tasks subscribe and wait on their [`ShutdownSignal`]. The
/// trigger is sticky: subscribing after [`Shutdown::trigger`] still observes it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the signal has fired.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half handed to a task.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait until shutdown is triggered or every [`Shutdown`] handle is gone.
    pub async fn recv(&mut self) {
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }
}
