//! Cross-type keyspace operations.
//!
//! These all go through the key directory, which knows every key and the
//! store that holds it, so none of them needs to lock the four containers
//! to get a consistent view.

use crate::Store;
use ember_bus::{KeyMatcher, RegexMatcher};
use ember_core::{ChangeEvent, Result, ValueKind};

impl Store {
    /// Whether `key` exists in any typed store.
    pub fn exists(&self, key: &str) -> bool {
        self.directory.read().contains_key(key)
    }

    /// Which store holds `key`, or `None` when absent.
    pub fn kind(&self, key: &str) -> Option<ValueKind> {
        self.directory.read().get(key).copied()
    }

    /// Remove each of `keys` from whichever store holds it. Missing keys
    /// are skipped silently. Returns how many keys were removed; one
    /// deletion event (no value snapshot) is published per removed key.
    pub fn del(&self, keys: &[&str]) -> usize {
        let mut dir = self.directory.write();
        let mut removed = 0;
        for key in keys {
            let Some(kind) = dir.remove(*key) else {
                continue;
            };
            match kind {
                ValueKind::Hash => {
                    self.hashes.write().remove(*key);
                }
                ValueKind::List => {
                    self.lists.write().remove(*key);
                }
                ValueKind::Set => {
                    self.sets.write().remove(*key);
                }
                ValueKind::String => {
                    self.strings.write().remove(*key);
                }
            }
            removed += 1;
            self.publisher.publish(ChangeEvent::deletion(kind, *key));
        }
        removed
    }

    /// All key names matching `pattern` (regex), across every store.
    /// Order is unspecified.
    pub fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let matcher = RegexMatcher::compile(pattern)?;
        let dir = self.directory.read();
        Ok(dir
            .keys()
            .filter(|key| matcher.matches(key))
            .cloned()
            .collect())
    }
}
