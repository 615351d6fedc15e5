//! String scalar operations.

use crate::{kind_matches, Store};
use ember_core::{ChangeEvent, Error, Result, ValueKind, ValueSnapshot};

impl Store {
    /// Set `key` to `value`, overwriting any previous string value.
    ///
    /// Fails with `TypeConflict` when the key is held by another kind.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let _claim = self.claim(key, ValueKind::String)?;
        let mut strings = self.strings.write();
        strings.insert(key.to_string(), value.to_string());
        self.publisher.publish(ChangeEvent::mutation(
            ValueKind::String,
            key,
            ValueSnapshot::String(value.to_string()),
        ));
        Ok(())
    }

    /// Value of `key`, or `None` when absent.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let dir = self.directory.read();
        if !kind_matches(&dir, key, ValueKind::String)? {
            return Ok(None);
        }
        Ok(self.strings.read().get(key).cloned())
    }

    /// Set `key` only if it does not exist anywhere in the keyspace.
    ///
    /// Returns whether the value was set. An occupied key of any kind makes
    /// this a no-op: "do nothing when present" is the contract, so no
    /// `TypeConflict` is raised here.
    pub fn setnx(&self, key: &str, value: &str) -> Result<bool> {
        {
            let dir = self.directory.read();
            if dir.contains_key(key) {
                return Ok(false);
            }
        }
        let mut dir = self.directory.write();
        if dir.contains_key(key) {
            return Ok(false);
        }
        dir.insert(key.to_string(), ValueKind::String);
        let _claim = parking_lot::RwLockWriteGuard::downgrade(dir);

        let mut strings = self.strings.write();
        strings.insert(key.to_string(), value.to_string());
        self.publisher.publish(ChangeEvent::mutation(
            ValueKind::String,
            key,
            ValueSnapshot::String(value.to_string()),
        ));
        Ok(true)
    }

    /// Increment the integer stored at `key` by one (absent key counts as 0)
    /// and return the new value.
    pub fn incr(&self, key: &str) -> Result<i64> {
        self.incr_by(key, 1)
    }

    /// Decrement the integer stored at `key` by one (absent key counts as 0)
    /// and return the new value.
    pub fn decr(&self, key: &str) -> Result<i64> {
        self.incr_by(key, -1)
    }

    fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        let _claim = self.claim(key, ValueKind::String)?;
        let mut strings = self.strings.write();
        let current = match strings.get(key) {
            None => 0,
            Some(text) => text.parse::<i64>().map_err(|_| Error::MalformedInteger {
                key: key.to_string(),
                value: text.clone(),
            })?,
        };
        let next = current.wrapping_add(delta);
        let text = next.to_string();
        strings.insert(key.to_string(), text.clone());
        self.publisher.publish(ChangeEvent::mutation(
            ValueKind::String,
            key,
            ValueSnapshot::String(text),
        ));
        Ok(next)
    }
}
