//! Observation hooks fired by the queue layers.
//!
//! Hooks run synchronously on the calling thread after the queue lock has
//! been released, so an implementation may call back into the queue. They
//! must not block for long: a slow hook stalls the producer or consumer
//! that triggered it, and for items delivered by a background loop it
//! stalls that loop.
//!
//! Since hooks run unlocked, hooks for one item fired on different threads
//! are not ordered: a consumer's `on_get` can land before the `on_add` of
//! the add that made the item ready. Hooks on a single thread fire in call
//! order.

use std::time::Duration;

/// Hook set for every public queue operation. Every method defaults to a
/// no-op, so implementors override only what they observe.
pub trait Callback<T>: Send + Sync {
    /// `add` accepted an item, whether it was linked into the ready list or
    /// deferred until its current consumer calls `done`.
    fn on_add(&self, _item: &T) {}

    /// An item was handed to a consumer.
    fn on_get(&self, _item: &T) {}

    /// A consumer finished with an item.
    fn on_done(&self, _item: &T) {}

    /// An item was scheduled for delayed delivery.
    fn on_add_after(&self, _item: &T, _delay: Duration) {}

    /// An item was scheduled for weighted delivery.
    fn on_add_weight(&self, _item: &T, _weight: i64) {}

    /// An item went through the rate limiter.
    fn on_add_limited(&self, _item: &T) {}

    /// The limiter's history for an item was reset.
    fn on_forget(&self, _item: &T) {}

    /// The limiter's attempt counter for an item was read.
    fn on_get_times(&self, _item: &T, _times: u32) {}
}

/// Default hooks: observe nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NopCallback;

impl<T> Callback<T> for NopCallback {}
