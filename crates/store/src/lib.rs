//! Typed stores and keyspace coordination
//!
//! One [`Store`] owns four independently locked containers (strings, lists,
//! sets, hashes) plus the **key directory**: a map from key to
//! [`ValueKind`] that is the single authority on which typed store holds a
//! key. Every write consults the directory first, so a key can never exist
//! in two stores at once; `exists`/`kind`/`keys` read the directory alone
//! instead of locking all four containers.
//!
//! ## Locking protocol
//!
//! Lock order is always directory → container (→ per-hash lock). Writers to
//! an existing key hold the directory *read* guard across the container
//! mutation; key creation takes the directory write lock and downgrades it.
//! Deletion takes the directory write lock. Because a writer keeps at least
//! a read guard from its kind check until its container mutation is done,
//! a concurrent `del` can never slip in between and strand a value without
//! a directory entry.
//!
//! Every mutation publishes a [`ChangeEvent`] while still holding its locks,
//! so the bus observes events in mutation order.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod hashes;
mod keyspace;
mod lists;
mod sets;
mod snapshot;
mod strings;

pub use snapshot::{HashSections, ListSections, SetSections, StringSections};

use ember_bus::Publisher;
use ember_core::{Error, Result, ValueKind};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub(crate) type Directory = HashMap<String, ValueKind>;
pub(crate) type HashEntry = Arc<RwLock<HashMap<String, String>>>;

/// Set membership plus the separately maintained cardinality counter.
///
/// The counter is kept in lockstep with `members` on every mutation so
/// `scard` is O(1) without touching the container.
#[derive(Debug, Default)]
pub(crate) struct SetEntry {
    pub(crate) members: HashSet<String>,
    pub(crate) cardinality: usize,
}

/// Concurrency-safe multi-type store.
///
/// Create one per database instance; all state lives in the value, there
/// are no process-wide globals, so independent stores can coexist (and be
/// tested) in one process.
pub struct Store {
    pub(crate) directory: RwLock<Directory>,
    pub(crate) strings: RwLock<HashMap<String, String>>,
    pub(crate) lists: RwLock<HashMap<String, Vec<String>>>,
    pub(crate) sets: RwLock<HashMap<String, SetEntry>>,
    pub(crate) hashes: RwLock<HashMap<String, HashEntry>>,
    pub(crate) publisher: Publisher,
}

impl Store {
    /// Create an empty store publishing change events through `publisher`.
    pub fn new(publisher: Publisher) -> Self {
        Store {
            directory: RwLock::new(HashMap::new()),
            strings: RwLock::new(HashMap::new()),
            lists: RwLock::new(HashMap::new()),
            sets: RwLock::new(HashMap::new()),
            hashes: RwLock::new(HashMap::new()),
            publisher,
        }
    }

    /// Claim `key` for `requested`, returning a directory read guard the
    /// caller must hold across its container mutation.
    ///
    /// Fails with [`Error::TypeConflict`] when another kind holds the key.
    /// On first use the kind is recorded under the directory write lock and
    /// the guard is downgraded, never released, before returning.
    pub(crate) fn claim(
        &self,
        key: &str,
        requested: ValueKind,
    ) -> Result<RwLockReadGuard<'_, Directory>> {
        let dir = self.directory.read();
        match dir.get(key).copied() {
            Some(held) if held == requested => return Ok(dir),
            Some(held) => {
                return Err(Error::TypeConflict {
                    key: key.to_string(),
                    held,
                    requested,
                })
            }
            None => {}
        }
        drop(dir);

        let mut dir = self.directory.write();
        match dir.get(key).copied() {
            Some(held) if held == requested => {}
            Some(held) => {
                return Err(Error::TypeConflict {
                    key: key.to_string(),
                    held,
                    requested,
                })
            }
            None => {
                dir.insert(key.to_string(), requested);
            }
        }
        Ok(RwLockWriteGuard::downgrade(dir))
    }
}

/// Kind check for read paths: `Ok(true)` when `key` is held as `requested`,
/// `Ok(false)` when absent, `TypeConflict` when held by another store.
pub(crate) fn kind_matches(dir: &Directory, key: &str, requested: ValueKind) -> Result<bool> {
    match dir.get(key).copied() {
        None => Ok(false),
        Some(held) if held == requested => Ok(true),
        Some(held) => Err(Error::TypeConflict {
            key: key.to_string(),
            held,
            requested,
        }),
    }
}
