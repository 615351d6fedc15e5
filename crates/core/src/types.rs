//! Value kind tagging
//!
//! A key holds at most one typed value across the whole keyspace; the kind
//! says which typed store owns it.

use std::fmt;

/// Which typed store a key belongs to.
///
/// The variant order (hash, list, set, string) is also the fixed snapshot
/// section order and the fixed multi-store lock acquisition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Field map (`hset`/`hget`/...)
    Hash,
    /// Ordered sequence of strings (`rpush`/`lrange`/...)
    List,
    /// Unordered unique strings (`sadd`/`smembers`/...)
    Set,
    /// Single string scalar (`set`/`get`/`incr`/...)
    String,
}

impl ValueKind {
    /// All kinds, in snapshot section order.
    pub const ALL: [ValueKind; 4] = [
        ValueKind::Hash,
        ValueKind::List,
        ValueKind::Set,
        ValueKind::String,
    ];

    /// Lowercase name, matching the event/type-command vocabulary.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Hash => "hash",
            ValueKind::List => "list",
            ValueKind::Set => "set",
            ValueKind::String => "string",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
