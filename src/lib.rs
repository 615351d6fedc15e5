//! EmberDB - embedded multi-type data store
//!
//! EmberDB keeps strings, lists, sets, and hashes under one shared keyspace,
//! publishes a [`ChangeEvent`] for every mutation to pattern-matched
//! subscribers, and snapshots itself to disk in the background.
//!
//! # Quick Start
//!
//! ```ignore
//! use emberdb::Database;
//!
//! let db = Database::new();
//!
//! let events = db.psubscribe(&["^user:"])?;
//!
//! db.set("user:123", "Alice")?;
//! db.rpush("user:123:logins", &["mon", "tue"])?;
//!
//! let event = events.recv()?;
//! assert_eq!(event.key, "user:123");
//! ```
//!
//! # Architecture
//!
//! A [`Database`] wires together three layers and owns their lifecycles:
//! the notification bus (dispatcher thread plus subscriber registry), the
//! typed stores behind a key directory that enforces one kind per key, and
//! the persistence engine for background saves and startup loads. The
//! layers live in their own crates; this facade re-exports everything a
//! caller needs.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;

pub use config::Config;
pub use ember_bus::{KeyMatcher, PatternSet, RegexMatcher, Subscription};
pub use ember_core::{ChangeEvent, Error, Result, ValueKind, ValueSnapshot};
pub use ember_persist::{LoadReport, SaveOutcome, SaveReport, SaveTicket};

use ember_bus::NotificationBus;
use ember_persist::PersistenceEngine;
use ember_store::Store;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An embedded multi-type data store.
///
/// All state lives in the value; independent databases in one process share
/// nothing. `Database` is not itself `Clone`: share it behind an `Arc`, all
/// operations take `&self`.
pub struct Database {
    bus: NotificationBus,
    store: Arc<Store>,
    persistence: PersistenceEngine,
}

impl Database {
    /// An empty database with default [`Config`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// An empty database with explicit queue capacities.
    pub fn with_config(config: Config) -> Self {
        let bus = NotificationBus::new(
            config.publish_queue_capacity,
            config.delivery_queue_capacity,
        );
        let store = Arc::new(Store::new(bus.publisher()));
        let persistence = PersistenceEngine::new(Arc::clone(&store), bus.publisher());
        Database {
            bus,
            store,
            persistence,
        }
    }

    // =========================================================================
    // Strings
    // =========================================================================

    /// Set `key` to `value`, overwriting any previous string value.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.store.set(key, value)
    }

    /// The string value of `key`, or `None` when absent.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.store.get(key)
    }

    /// Set `key` only if no key of any kind exists under that name.
    /// Returns whether the value was written.
    pub fn setnx(&self, key: &str, value: &str) -> Result<bool> {
        self.store.setnx(key, value)
    }

    /// Increment the integer value of `key` by one (absent counts as 0).
    pub fn incr(&self, key: &str) -> Result<i64> {
        self.store.incr(key)
    }

    /// Decrement the integer value of `key` by one (absent counts as 0).
    pub fn decr(&self, key: &str) -> Result<i64> {
        self.store.decr(key)
    }

    // =========================================================================
    // Lists
    // =========================================================================

    /// Append `values` to the list at `key`, creating it on first push.
    /// Returns the list length after the append.
    pub fn rpush(&self, key: &str, values: &[&str]) -> Result<usize> {
        self.store.rpush(key, values)
    }

    /// The elements between `start` and `stop` inclusive; negative indexes
    /// count from the tail. Out-of-range requests clamp to the list.
    pub fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        self.store.lrange(key, start, stop)
    }

    /// The length of the list at `key` (0 when absent).
    pub fn llen(&self, key: &str) -> Result<usize> {
        self.store.llen(key)
    }

    // =========================================================================
    // Sets
    // =========================================================================

    /// Add `members` to the set at `key`. Returns how many were new.
    pub fn sadd(&self, key: &str, members: &[&str]) -> Result<usize> {
        self.store.sadd(key, members)
    }

    /// All members of the set at `key`, in unspecified order.
    pub fn smembers(&self, key: &str) -> Result<Vec<String>> {
        self.store.smembers(key)
    }

    /// The cardinality of the set at `key` (0 when absent).
    pub fn scard(&self, key: &str) -> Result<usize> {
        self.store.scard(key)
    }

    // =========================================================================
    // Hashes
    // =========================================================================

    /// Set `field` to `value` in the hash at `key`. Returns whether the
    /// field was newly created (as opposed to overwritten).
    pub fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        self.store.hset(key, field, value)
    }

    /// The value of `field` in the hash at `key`, or `None` when either
    /// the hash or the field is absent.
    pub fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        self.store.hget(key, field)
    }

    /// Remove `field` from the hash at `key`. Returns whether it existed.
    pub fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        self.store.hdel(key, field)
    }

    /// Whether `field` exists in the hash at `key`.
    pub fn hexists(&self, key: &str, field: &str) -> Result<bool> {
        self.store.hexists(key, field)
    }

    /// A copy of every field and value in the hash at `key`.
    pub fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        self.store.hgetall(key)
    }

    /// The field names of the hash at `key`, in unspecified order.
    pub fn hkeys(&self, key: &str) -> Result<Vec<String>> {
        self.store.hkeys(key)
    }

    /// The field values of the hash at `key`, in unspecified order.
    pub fn hvals(&self, key: &str) -> Result<Vec<String>> {
        self.store.hvals(key)
    }

    // =========================================================================
    // Keyspace
    // =========================================================================

    /// Whether `key` exists under any kind.
    pub fn exists(&self, key: &str) -> bool {
        self.store.exists(key)
    }

    /// Which kind holds `key`, or `None` when absent.
    pub fn kind(&self, key: &str) -> Option<ValueKind> {
        self.store.kind(key)
    }

    /// Remove each of `keys`, whatever its kind. Missing keys are skipped.
    /// Returns how many were removed.
    pub fn del(&self, keys: &[&str]) -> usize {
        self.store.del(keys)
    }

    /// All key names matching the regex `pattern`, across every kind.
    pub fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.store.keys(pattern)
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Subscribe to change events for keys matching any of the regex
    /// `patterns`. Each event is delivered at most once per subscription,
    /// however many patterns match it. Dropping (or cancelling) the
    /// returned [`Subscription`] unregisters it.
    pub fn psubscribe(&self, patterns: &[&str]) -> Result<Subscription> {
        self.bus.subscribe(patterns)
    }

    /// Subscribe with caller-built matchers instead of regex patterns.
    pub fn psubscribe_matchers(&self, patterns: PatternSet) -> Subscription {
        self.bus.subscribe_matchers(patterns)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Snapshot the database to `path` in the background.
    ///
    /// Returns [`SaveOutcome::Clean`] without touching the disk when nothing
    /// was published since the last save. The returned ticket reports the
    /// write's result and can cancel it.
    pub fn bg_save(&self, path: impl Into<PathBuf>) -> SaveOutcome {
        self.persistence.bg_save(path)
    }

    /// Load a snapshot from `path`, replacing current contents per section.
    /// A missing file is a no-op.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<LoadReport> {
        self.persistence.load(path)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Stop the dispatcher thread. Subsequent publishes are discarded and
    /// subscriptions see [`Error::BusClosed`]. Dropping the database does
    /// this implicitly.
    pub fn shutdown(&self) {
        self.bus.shutdown();
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}
