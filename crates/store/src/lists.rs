//! Ordered list operations. Lists grow only at the tail.

use crate::{kind_matches, Store};
use ember_core::{ChangeEvent, Result, ValueKind, ValueSnapshot};

impl Store {
    /// Append `values` to the tail of the list at `key`, creating it first
    /// if needed. Returns the length after the push.
    pub fn rpush(&self, key: &str, values: &[&str]) -> Result<usize> {
        let _claim = self.claim(key, ValueKind::List)?;
        let mut lists = self.lists.write();
        let list = lists.entry(key.to_string()).or_default();
        list.extend(values.iter().map(|v| (*v).to_string()));
        let len = list.len();
        self.publisher.publish(ChangeEvent::mutation(
            ValueKind::List,
            key,
            ValueSnapshot::List(list.clone()),
        ));
        Ok(len)
    }

    /// Elements between `start` and `stop` inclusive, with Redis index
    /// semantics: negative offsets count from the tail, out-of-range
    /// offsets are clamped, and an inverted range is empty.
    pub fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        let dir = self.directory.read();
        if !kind_matches(&dir, key, ValueKind::List)? {
            return Ok(Vec::new());
        }
        let lists = self.lists.read();
        Ok(lists
            .get(key)
            .map(|list| range_of(list, start, stop))
            .unwrap_or_default())
    }

    /// Length of the list at `key`; an absent key is an empty list.
    pub fn llen(&self, key: &str) -> Result<usize> {
        let dir = self.directory.read();
        if !kind_matches(&dir, key, ValueKind::List)? {
            return Ok(0);
        }
        Ok(self.lists.read().get(key).map(Vec::len).unwrap_or(0))
    }
}

fn range_of(list: &[String], start: i64, stop: i64) -> Vec<String> {
    let len = list.len() as i64;
    let mut start = if start < 0 { len + start } else { start };
    let mut stop = if stop < 0 { len + stop } else { stop };
    if start < 0 {
        start = 0;
    }
    if stop >= len {
        stop = len - 1;
    }
    if start > stop || start >= len || stop < 0 {
        return Vec::new();
    }
    list[start as usize..=stop as usize].to_vec()
}
