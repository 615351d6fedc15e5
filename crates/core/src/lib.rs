//! Core types for EmberDB
//!
//! This crate defines the foundational types shared by every other crate:
//! - ValueKind: discriminates the four typed stores
//! - ChangeEvent / ValueSnapshot: immutable mutation records for the bus
//! - Error: the error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod event;
pub mod types;

pub use error::{Error, Result};
pub use event::{ChangeEvent, ValueSnapshot};
pub use types::ValueKind;
