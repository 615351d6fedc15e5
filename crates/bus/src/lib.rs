//! Change-notification bus
//!
//! Every mutation in the store enqueues a [`ChangeEvent`](ember_core::ChangeEvent)
//! onto a single bounded publish queue. One dedicated dispatcher thread drains
//! the queue strictly in enqueue order and forwards each event to every
//! subscription whose pattern set matches the event's key.
//!
//! ```text
//! mutators ──► publish queue (bounded, blocking) ──► dispatcher thread
//!                                                        │ registry scan
//!                                                        ▼
//!                                    per-subscription delivery queues
//!                                    (bounded, drop-on-full, counted)
//! ```
//!
//! Delivery guarantees:
//! - all subscribers observe events in the shared publish order
//! - a subscription receives a matching event once, even if several of its
//!   patterns match the key
//! - the dispatcher never blocks on a slow subscriber; a full delivery queue
//!   drops the event for that subscriber and counts the drop on its handle

#![warn(missing_docs)]
#![warn(clippy::all)]

mod bus;
mod pattern;
mod subscription;

pub use bus::{NotificationBus, Publisher};
pub use pattern::{KeyMatcher, PatternSet, RegexMatcher};
pub use subscription::Subscription;
