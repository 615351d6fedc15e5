//! Bus wiring: publish queue, dispatcher thread, subscription registry.

use crate::pattern::PatternSet;
use crate::subscription::Subscription;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use dashmap::DashMap;
use ember_core::{ChangeEvent, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

pub(crate) struct SubscriberEntry {
    pub(crate) patterns: PatternSet,
    pub(crate) tx: Sender<ChangeEvent>,
    pub(crate) dropped: Arc<AtomicU64>,
}

#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) subscribers: DashMap<u64, SubscriberEntry>,
    next_id: AtomicU64,
}

/// Cloneable handle used by mutators to enqueue change events.
///
/// `publish` blocks while the publish queue is full; that is the intended
/// flow-control mechanism, not an error. It also maintains the monotonically
/// increasing publish counter the persistence engine compares against.
#[derive(Clone)]
pub struct Publisher {
    tx: Sender<ChangeEvent>,
    published: Arc<AtomicU64>,
}

impl Publisher {
    /// Enqueue one event, blocking if the publish queue is full.
    ///
    /// After the bus has shut down the event is discarded with a warning;
    /// the mutation it described has already been applied.
    pub fn publish(&self, event: ChangeEvent) {
        match self.tx.send(event) {
            Ok(()) => {
                self.published.fetch_add(1, Ordering::Release);
            }
            Err(err) => {
                warn!(key = %err.into_inner().key, "bus is closed, dropping change event");
            }
        }
    }

    /// Total events published so far.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Acquire)
    }
}

/// Asynchronous pattern-matching publish/subscribe fan-out.
///
/// Owns the dispatcher thread and the subscription registry. Dropping the
/// bus shuts the dispatcher down; mutators still holding a [`Publisher`]
/// keep working, their events are simply discarded.
pub struct NotificationBus {
    registry: Arc<Registry>,
    publisher: Publisher,
    delivery_capacity: usize,
    shutdown_tx: Sender<()>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationBus {
    /// Start a bus with the given publish and per-subscription queue bounds.
    pub fn new(publish_capacity: usize, delivery_capacity: usize) -> Self {
        let (event_tx, event_rx) = bounded(publish_capacity);
        let (shutdown_tx, shutdown_rx) = bounded(1);
        let registry = Arc::new(Registry::default());

        let dispatcher_registry = Arc::clone(&registry);
        let handle = std::thread::Builder::new()
            .name("ember-dispatch".to_string())
            .spawn(move || dispatch_loop(&dispatcher_registry, &event_rx, &shutdown_rx))
            .expect("failed to spawn notification dispatcher thread");

        NotificationBus {
            registry,
            publisher: Publisher {
                tx: event_tx,
                published: Arc::new(AtomicU64::new(0)),
            },
            delivery_capacity,
            shutdown_tx,
            dispatcher: Mutex::new(Some(handle)),
        }
    }

    /// Handle for mutators to publish through.
    pub fn publisher(&self) -> Publisher {
        self.publisher.clone()
    }

    /// Subscribe to every key matching any of `patterns` (default regex
    /// language, see [`RegexMatcher`](crate::RegexMatcher)).
    ///
    /// A matching event is delivered once per event even when several
    /// patterns match. The returned handle unsubscribes on drop.
    pub fn subscribe(&self, patterns: &[&str]) -> Result<Subscription> {
        Ok(self.subscribe_matchers(PatternSet::compile(patterns)?))
    }

    /// Subscribe with pre-compiled matchers.
    pub fn subscribe_matchers(&self, patterns: PatternSet) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = bounded(self.delivery_capacity);
        let dropped = Arc::new(AtomicU64::new(0));
        self.registry.subscribers.insert(
            id,
            SubscriberEntry {
                patterns,
                tx,
                dropped: Arc::clone(&dropped),
            },
        );
        debug!(subscriber = id, "registered subscription");
        Subscription::new(id, rx, dropped, Arc::clone(&self.registry))
    }

    /// Stop the dispatcher and join its thread. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.dispatcher.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for NotificationBus {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn dispatch_loop(
    registry: &Registry,
    events: &Receiver<ChangeEvent>,
    shutdown: &Receiver<()>,
) {
    loop {
        crossbeam_channel::select! {
            recv(events) -> msg => match msg {
                Ok(event) => deliver(registry, event),
                Err(_) => break,
            },
            recv(shutdown) -> _ => break,
        }
    }
    debug!("notification dispatcher stopped");
}

fn deliver(registry: &Registry, event: ChangeEvent) {
    let mut stale = Vec::new();
    for entry in registry.subscribers.iter() {
        if !entry.patterns.matches(&event.key) {
            continue;
        }
        match entry.tx.try_send(event.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                entry.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(
                    subscriber = *entry.key(),
                    key = %event.key,
                    "delivery queue full, dropping event"
                );
            }
            Err(TrySendError::Disconnected(_)) => stale.push(*entry.key()),
        }
    }
    // Receivers that went away without cancel() get cleaned up here.
    for id in stale {
        registry.subscribers.remove(&id);
    }
}
