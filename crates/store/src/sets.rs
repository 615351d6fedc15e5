//! Unordered set operations.

use crate::{kind_matches, SetEntry, Store};
use ember_core::{ChangeEvent, Result, ValueKind, ValueSnapshot};

impl Store {
    /// Add `members` to the set at `key`, creating it first if needed.
    /// Returns how many members were newly added; existing members are
    /// ignored. The cardinality counter moves in lockstep with membership.
    pub fn sadd(&self, key: &str, members: &[&str]) -> Result<usize> {
        let _claim = self.claim(key, ValueKind::Set)?;
        let mut sets = self.sets.write();
        let entry = sets.entry(key.to_string()).or_insert_with(SetEntry::default);

        let mut added = 0;
        for member in members {
            if entry.members.insert((*member).to_string()) {
                added += 1;
                entry.cardinality += 1;
            }
        }

        self.publisher.publish(ChangeEvent::mutation(
            ValueKind::Set,
            key,
            ValueSnapshot::Set(entry.members.iter().cloned().collect()),
        ));
        Ok(added)
    }

    /// All members of the set at `key`, order unspecified.
    pub fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let dir = self.directory.read();
        if !kind_matches(&dir, key, ValueKind::Set)? {
            return Ok(Vec::new());
        }
        Ok(self
            .sets
            .read()
            .get(key)
            .map(|entry| entry.members.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Cardinality of the set at `key`, read from the maintained counter
    /// rather than counting the container.
    pub fn scard(&self, key: &str) -> Result<usize> {
        let dir = self.directory.read();
        if !kind_matches(&dir, key, ValueKind::Set)? {
            return Ok(0);
        }
        Ok(self
            .sets
            .read()
            .get(key)
            .map(|entry| entry.cardinality)
            .unwrap_or(0))
    }
}
