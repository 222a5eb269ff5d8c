//! Reactive projection
//!
//! A `Projection` holds the latest committed value of some read model. A new
//! subscriber receives the current value immediately, then every published
//! value in publish order. Delivery uses unbounded channels so a slow
//! subscriber never causes another to miss an update.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

struct Inner<T> {
    current: T,
    subscribers: Vec<mpsc::UnboundedSender<T>>,
}

/// Latest-value store with ordered fan-out
pub struct Projection<T> {
    inner: Mutex<Inner<T>>,
}

impl<T: Clone + Send + 'static> Projection<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Mutex::new(Inner {
                current: initial,
                subscribers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clone of the latest value
    pub fn current(&self) -> T {
        self.lock().current.clone()
    }

    /// Subscribe, receiving the latest value first
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        // Cannot fail: the receiver is still held here
        let _ = tx.send(inner.current.clone());
        inner.subscribers.push(tx);
        Subscription { rx }
    }

    /// Replace the latest value and deliver it to every live subscriber
    pub fn publish(&self, value: T) {
        let mut inner = self.lock();
        inner
            .subscribers
            .retain(|tx| tx.send(value.clone()).is_ok());
        inner.current = value;
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}

/// Receiving end of a projection subscription
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Wait for the next value; `None` once the projection is dropped
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Next already-delivered value, if any
    pub fn try_next(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Drain every delivered value, returning the most recent one
    pub fn latest(&mut self) -> Option<T> {
        let mut last = None;
        while let Some(value) = self.try_next() {
            last = Some(value);
        }
        last
    }
}
