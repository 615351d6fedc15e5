//! Error types for EmberDB
//!
//! All failure conditions are local and recoverable; none is fatal to the
//! process. We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.

use crate::types::ValueKind;
use std::io;
use thiserror::Error;

/// Result type alias for EmberDB operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for EmberDB operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Snapshot file read/write failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An operation addressed a key that another typed store already holds.
    #[error("key {key:?} holds a {held} value, not a {requested}")]
    TypeConflict {
        /// The contested key.
        key: String,
        /// The kind the keyspace holds for it.
        held: ValueKind,
        /// The kind the failed operation asked for.
        requested: ValueKind,
    },

    /// `incr`/`decr` on a string value that is not a base-10 integer.
    #[error("value at {key:?} is not an integer: {value:?}")]
    MalformedInteger {
        /// The addressed key.
        key: String,
        /// The stored text that failed to parse.
        value: String,
    },

    /// A subscription or key-scan pattern failed to compile.
    #[error("invalid pattern {pattern:?}: {reason}")]
    Pattern {
        /// The pattern as given.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// A snapshot section failed to decode. Sections before it were already
    /// applied; sections after it were not read.
    #[error("failed to decode {section} snapshot section: {reason}")]
    Decode {
        /// Which of the four sections failed.
        section: ValueKind,
        /// Decoder diagnostic.
        reason: String,
    },

    /// A background save was cancelled before it completed.
    #[error("save cancelled")]
    Cancelled,

    /// The notification bus dispatcher is no longer running.
    #[error("notification bus is closed")]
    BusClosed,
}
