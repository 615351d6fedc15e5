//! Database construction options.

/// Tuning knobs for a [`crate::Database`].
///
/// Both capacities bound memory, not correctness: a full publish queue
/// applies backpressure to writers, a full delivery queue drops events for
/// that subscriber only (counted on its [`crate::Subscription`]).
#[derive(Debug, Clone)]
pub struct Config {
    /// Capacity of the global publish queue between writers and the
    /// dispatcher thread.
    pub publish_queue_capacity: usize,
    /// Capacity of each subscriber's delivery queue.
    pub delivery_queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            publish_queue_capacity: 1000,
            delivery_queue_capacity: 1000,
        }
    }
}
