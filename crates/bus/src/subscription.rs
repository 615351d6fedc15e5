//! Subscription handles
//!
//! A subscription owns the receiving half of its bounded delivery queue and
//! unregisters itself from the bus when cancelled or dropped.

use crate::bus::Registry;
use crossbeam_channel::Receiver;
use ember_core::{ChangeEvent, Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Consumable event stream for one set of patterns.
///
/// Events arrive in the shared publish order, minus any the dispatcher had
/// to drop because this subscription's queue was full (see
/// [`dropped_events`](Subscription::dropped_events)).
pub struct Subscription {
    id: u64,
    rx: Receiver<ChangeEvent>,
    dropped: Arc<AtomicU64>,
    registry: Arc<Registry>,
}

impl Subscription {
    pub(crate) fn new(
        id: u64,
        rx: Receiver<ChangeEvent>,
        dropped: Arc<AtomicU64>,
        registry: Arc<Registry>,
    ) -> Self {
        Subscription {
            id,
            rx,
            dropped,
            registry,
        }
    }

    /// Registry id of this subscription.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Block until the next matching event arrives.
    ///
    /// Returns [`Error::BusClosed`] once the subscription is cancelled or the
    /// bus has shut down and the queue is drained.
    pub fn recv(&self) -> Result<ChangeEvent> {
        self.rx.recv().map_err(|_| Error::BusClosed)
    }

    /// Next event if one is already queued.
    pub fn try_recv(&self) -> Option<ChangeEvent> {
        self.rx.try_recv().ok()
    }

    /// Block up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ChangeEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Blocking iterator over events, ending when the subscription closes.
    pub fn iter(&self) -> impl Iterator<Item = ChangeEvent> + '_ {
        self.rx.iter()
    }

    /// Events the dispatcher dropped because this queue was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Unregister from the bus. Already-queued events remain readable;
    /// after they drain, `recv` reports [`Error::BusClosed`].
    pub fn cancel(&self) {
        if self.registry.subscribers.remove(&self.id).is_some() {
            debug!(subscriber = self.id, "cancelled subscription");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
