//! Single-slot rendezvous between one producer side and one consumer.
//!
//! [`HandoffSender::put`] does not return until [`HandoffReceiver::take`] has
//! taken the item, so at most one item is ever in transit and a producer can
//! never run ahead of the consumer. Waiting producers are admitted in the
//! order they called `put`.
//!
//! The slot closes when the receiver is dropped. A producer still waiting for
//! the slot gets its item back in [`HandoffError::Closed`]; an item already
//! sitting in the slot is dropped with it ([`HandoffError::Abandoned`]).

use std::fmt;

use tokio::sync::{mpsc, oneshot};

struct Offer<T> {
    item: T,
    taken: oneshot::Sender<()>,
}

/// Create a connected sender/receiver pair.
pub fn handoff<T: Send>() -> (HandoffSender<T>, HandoffReceiver<T>) {
    let (tx, rx) = mpsc::channel(1);
    (HandoffSender { tx }, HandoffReceiver { rx })
}

/// Why a [`HandoffSender::put`] did not complete.
pub enum HandoffError<T> {
    /// The receiver was gone before the item entered the slot.
    Closed(T),
    /// The receiver was dropped while the item sat in the slot.
    Abandoned,
}

impl<T> fmt::Debug for HandoffError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandoffError::Closed(_) => f.write_str("Closed(..)"),
            HandoffError::Abandoned => f.write_str("Abandoned"),
        }
    }
}

impl<T> fmt::Display for HandoffError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandoffError::Closed(_) => write!(f, "handoff closed before the item was offered"),
            HandoffError::Abandoned => write!(f, "handoff closed before the item was taken"),
        }
    }
}

impl<T> std::error::Error for HandoffError<T> {}

/// Producer side. Cheap to clone; every clone feeds the same slot.
pub struct HandoffSender<T> {
    tx: mpsc::Sender<Offer<T>>,
}

impl<T> Clone for HandoffSender<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T: Send> HandoffSender<T> {
    /// Offer `item` and wait until the consumer has taken it.
    ///
    /// There is no timeout: with no consumer this waits until the receiver
    /// is dropped.
    pub async fn put(&self, item: T) -> Result<(), HandoffError<T>> {
        let permit = match self.tx.reserve().await {
            Ok(permit) => permit,
            Err(_) => return Err(HandoffError::Closed(item)),
        };

        let (taken_tx, taken_rx) = oneshot::channel();
        permit.send(Offer {
            item,
            taken: taken_tx,
        });

        taken_rx.await.map_err(|_| HandoffError::Abandoned)
    }

    /// Whether the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side.
pub struct HandoffReceiver<T> {
    rx: mpsc::Receiver<Offer<T>>,
}

impl<T: Send> HandoffReceiver<T> {
    /// Wait for the next item and release the producer that offered it.
    ///
    /// Never fails. Once every sender is gone this stays pending forever.
    /// Cancel safe.
    pub async fn take(&mut self) -> T {
        match self.rx.recv().await {
            Some(Offer { item, taken }) => {
                // The producer may have given up waiting; the item is ours either way.
                let _ = taken.send(());
                item
            }
            None => std::future::pending().await,
        }
    }
}
