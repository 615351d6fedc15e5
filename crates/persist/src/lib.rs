//! Background snapshot writer and startup loader
//!
//! A snapshot is four sequentially written, independently decodable JSON
//! documents in the fixed order hash → list → set → string. No header, no
//! version tag, no checksum. Each section is dumped under its own store
//! lock only, so the file is consistent per type but not atomic across
//! types.
//!
//! `bg_save` is gated by the bus publish counter: when nothing has been
//! published since the last save it returns immediately without touching
//! the disk. Otherwise it records the counter, returns a [`SaveTicket`],
//! and a named background thread (serialized against other saves by a file
//! mutex) writes a temp file and renames it into place.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod engine;

pub use engine::{LoadReport, PersistenceEngine, SaveOutcome, SaveReport, SaveTicket};
