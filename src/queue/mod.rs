//! Queue layers.
//!
//! Each layer holds the one below it and forwards what it does not
//! intercept:
//!
//! ```text
//! RateLimitingScheduler ── DelayScheduler ── BaseQueue<T, DelayState<T>>
//!                          PriorityScheduler ── BaseQueue<T, TimingHeap<T>>
//! ```
//!
//! The schedulers keep their heap inside the base queue's mutex, so the
//! background loop can pop a due element and link it into the ready list
//! as one atomic step.

pub mod base;
pub mod delaying;
pub mod limiting;
pub mod priority;

use std::hash::Hash;
use std::time::Duration;

use crate::error::Result;

pub use base::BaseQueue;
pub use delaying::DelayScheduler;
pub use limiting::RateLimitingScheduler;
pub use priority::PriorityScheduler;

/// Bounds every queued item satisfies. Identity is `Eq + Hash`.
pub trait Item: Clone + Eq + Hash + Send + Sync + 'static {}

impl<T> Item for T where T: Clone + Eq + Hash + Send + Sync + 'static {}

/// FIFO with at most one consumer in flight per item.
pub trait Queue<T: Item> {
    /// Queues `item` unless it is already waiting for delivery.
    ///
    /// An item currently checked out by a consumer is accepted and is
    /// delivered again once that consumer calls [`Queue::done`].
    fn add(&self, item: T) -> Result<()>;

    /// Takes the oldest ready item without blocking.
    fn get(&self) -> Result<T>;

    /// Takes the oldest ready item, parking the thread until one arrives or
    /// the queue is stopped.
    fn get_blocking(&self) -> Result<T>;

    /// Releases the consumer's hold on `item`.
    fn done(&self, item: &T);

    /// Ready items, not counting ones checked out or scheduled for later.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_closed(&self) -> bool;

    /// Shuts the queue down. Idempotent; returns once every background
    /// loop has exited.
    fn stop(&self);
}

pub trait DelayingQueue<T: Item>: Queue<T> {
    /// Queues `item` once `delay` has elapsed. A zero delay adds directly.
    fn add_after(&self, item: T, delay: Duration) -> Result<()>;
}

pub trait PriorityQueue<T: Item>: Queue<T> {
    /// Queues `item` at the next sort window, lower weights first. A
    /// weight of zero or less adds directly. Weighting an item that is
    /// still waiting keeps one entry at the lower weight.
    fn add_weight(&self, item: T, weight: i64) -> Result<()>;
}

pub trait RateLimitingQueue<T: Item>: DelayingQueue<T> {
    /// Queues `item` after whatever wait the rate limiter imposes.
    fn add_limited(&self, item: T) -> Result<()>;

    /// Clears the limiter's history for `item`. Queue membership is untouched.
    fn forget(&self, item: &T);

    /// Times the limiter has delayed `item` since it was last forgotten.
    fn num_limit_times(&self, item: &T) -> u32;
}
