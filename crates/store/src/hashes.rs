//! Hash (field map) operations.
//!
//! Each hash sits behind its own lock, so field access on one hash does not
//! serialize against field access on another. The outer container write
//! lock is only taken to create a hash.

use crate::{kind_matches, HashEntry, Store};
use ember_core::{ChangeEvent, Error, Result, ValueKind};
use std::collections::HashMap;
use std::sync::Arc;

impl Store {
    /// Set `field` in the hash at `key`, creating the hash on first use.
    /// Returns whether the field was newly created (as opposed to updated).
    pub fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        let _claim = self.claim(key, ValueKind::Hash)?;

        let entry = self.hash_entry_or_create(key);
        let mut fields = entry.write();
        let created = !fields.contains_key(field);
        fields.insert(field.to_string(), value.to_string());
        // Publish before releasing the field lock, so two writers to the
        // same hash cannot enqueue their events out of mutation order.
        self.publisher
            .publish(ChangeEvent::field_mutation(key, field, fields.clone()));
        Ok(created)
    }

    /// Value of `field` in the hash at `key`, or `None` when either the
    /// hash or the field is absent.
    pub fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let dir = self.directory.read();
        if !kind_matches(&dir, key, ValueKind::Hash)? {
            return Ok(None);
        }
        let hashes = self.hashes.read();
        Ok(hashes
            .get(key)
            .and_then(|entry| entry.read().get(field).cloned()))
    }

    /// Remove `field` from the hash at `key`; returns whether it existed.
    ///
    /// Deleting from a missing hash is a no-op that still publishes a valid
    /// event carrying an empty hash snapshot.
    pub fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        let dir = self.directory.read();
        match dir.get(key).copied() {
            None => {
                self.publisher
                    .publish(ChangeEvent::field_mutation(key, field, HashMap::new()));
                return Ok(false);
            }
            Some(ValueKind::Hash) => {}
            Some(held) => {
                return Err(Error::TypeConflict {
                    key: key.to_string(),
                    held,
                    requested: ValueKind::Hash,
                })
            }
        }

        let hashes = self.hashes.read();
        let Some(entry) = hashes.get(key).map(Arc::clone) else {
            // Directory says hash but the container is empty; treat as the
            // missing-hash no-op.
            self.publisher
                .publish(ChangeEvent::field_mutation(key, field, HashMap::new()));
            return Ok(false);
        };
        drop(hashes);

        let mut fields = entry.write();
        let removed = fields.remove(field).is_some();
        // As in hset, publish while the field lock is still held.
        self.publisher
            .publish(ChangeEvent::field_mutation(key, field, fields.clone()));
        Ok(removed)
    }

    /// Whether `field` exists in the hash at `key`.
    pub fn hexists(&self, key: &str, field: &str) -> Result<bool> {
        let dir = self.directory.read();
        if !kind_matches(&dir, key, ValueKind::Hash)? {
            return Ok(false);
        }
        let hashes = self.hashes.read();
        Ok(hashes
            .get(key)
            .map(|entry| entry.read().contains_key(field))
            .unwrap_or(false))
    }

    /// Deep copy of all fields and values; empty when the hash is absent.
    pub fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        let dir = self.directory.read();
        if !kind_matches(&dir, key, ValueKind::Hash)? {
            return Ok(HashMap::new());
        }
        let hashes = self.hashes.read();
        Ok(hashes
            .get(key)
            .map(|entry| entry.read().clone())
            .unwrap_or_default())
    }

    /// All field names of the hash at `key`, order unspecified.
    pub fn hkeys(&self, key: &str) -> Result<Vec<String>> {
        Ok(self.hgetall(key)?.into_keys().collect())
    }

    /// All values of the hash at `key`, order unspecified.
    pub fn hvals(&self, key: &str) -> Result<Vec<String>> {
        Ok(self.hgetall(key)?.into_values().collect())
    }

    fn hash_entry_or_create(&self, key: &str) -> HashEntry {
        {
            let hashes = self.hashes.read();
            if let Some(entry) = hashes.get(key) {
                return Arc::clone(entry);
            }
        }
        let mut hashes = self.hashes.write();
        Arc::clone(hashes.entry(key.to_string()).or_default())
    }
}
