//! Dump and restore support for the persistence engine.
//!
//! Dumps take one container read lock at a time, so a full dump is
//! internally consistent per type but not atomic across types; no invariant
//! spans types. Restores rebuild both the container and the key directory,
//! and recompute set cardinality from membership.

use crate::{SetEntry, Store};
use ember_core::ValueKind;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Serialized shape of the hash section: key → field map.
pub type HashSections = HashMap<String, HashMap<String, String>>;
/// Serialized shape of the list section: key → elements in order.
pub type ListSections = HashMap<String, Vec<String>>;
/// Serialized shape of the set section: key → members.
pub type SetSections = HashMap<String, Vec<String>>;
/// Serialized shape of the string section: key → value.
pub type StringSections = HashMap<String, String>;

impl Store {
    /// Point-in-time copy of every hash, under the hash container lock.
    pub fn dump_hashes(&self) -> HashSections {
        self.hashes
            .read()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.read().clone()))
            .collect()
    }

    /// Point-in-time copy of every list, under the list container lock.
    pub fn dump_lists(&self) -> ListSections {
        self.lists.read().clone()
    }

    /// Point-in-time copy of every set's members (sorted, for stable
    /// dumps), under the set container lock.
    pub fn dump_sets(&self) -> SetSections {
        self.sets
            .read()
            .iter()
            .map(|(key, entry)| {
                let mut members: Vec<String> = entry.members.iter().cloned().collect();
                members.sort();
                (key.clone(), members)
            })
            .collect()
    }

    /// Point-in-time copy of every string, under the string container lock.
    pub fn dump_strings(&self) -> StringSections {
        self.strings.read().clone()
    }

    /// Replace all hashes with `data`. Returns (loaded, skipped).
    pub fn restore_hashes(&self, data: HashSections) -> (usize, usize) {
        let mut dir = self.directory.write();
        dir.retain(|_, kind| *kind != ValueKind::Hash);
        let mut hashes = self.hashes.write();
        hashes.clear();

        let mut loaded = 0;
        let mut skipped = 0;
        for (key, fields) in data {
            if dir.contains_key(&key) {
                warn!(%key, "snapshot key already restored under another kind, skipping");
                skipped += 1;
                continue;
            }
            dir.insert(key.clone(), ValueKind::Hash);
            hashes.insert(key, Arc::new(parking_lot::RwLock::new(fields)));
            loaded += 1;
        }
        (loaded, skipped)
    }

    /// Replace all lists with `data`. Returns (loaded, skipped).
    pub fn restore_lists(&self, data: ListSections) -> (usize, usize) {
        let mut dir = self.directory.write();
        dir.retain(|_, kind| *kind != ValueKind::List);
        let mut lists = self.lists.write();
        lists.clear();

        let mut loaded = 0;
        let mut skipped = 0;
        for (key, elements) in data {
            if dir.contains_key(&key) {
                warn!(%key, "snapshot key already restored under another kind, skipping");
                skipped += 1;
                continue;
            }
            dir.insert(key.clone(), ValueKind::List);
            lists.insert(key, elements);
            loaded += 1;
        }
        (loaded, skipped)
    }

    /// Replace all sets with `data`, rebuilding each cardinality counter
    /// from the restored membership. Returns (loaded, skipped).
    pub fn restore_sets(&self, data: SetSections) -> (usize, usize) {
        let mut dir = self.directory.write();
        dir.retain(|_, kind| *kind != ValueKind::Set);
        let mut sets = self.sets.write();
        sets.clear();

        let mut loaded = 0;
        let mut skipped = 0;
        for (key, members) in data {
            if dir.contains_key(&key) {
                warn!(%key, "snapshot key already restored under another kind, skipping");
                skipped += 1;
                continue;
            }
            let members: std::collections::HashSet<String> = members.into_iter().collect();
            let cardinality = members.len();
            dir.insert(key.clone(), ValueKind::Set);
            sets.insert(
                key,
                SetEntry {
                    members,
                    cardinality,
                },
            );
            loaded += 1;
        }
        (loaded, skipped)
    }

    /// Replace all strings with `data`. Returns (loaded, skipped).
    pub fn restore_strings(&self, data: StringSections) -> (usize, usize) {
        let mut dir = self.directory.write();
        dir.retain(|_, kind| *kind != ValueKind::String);
        let mut strings = self.strings.write();
        strings.clear();

        let mut loaded = 0;
        let mut skipped = 0;
        for (key, value) in data {
            if dir.contains_key(&key) {
                warn!(%key, "snapshot key already restored under another kind, skipping");
                skipped += 1;
                continue;
            }
            dir.insert(key.clone(), ValueKind::String);
            strings.insert(key, value);
            loaded += 1;
        }
        (loaded, skipped)
    }
}
