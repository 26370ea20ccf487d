//! Admission control for rate-limited delivery.
//!
//! A [`RateLimiter`] answers "how long should this item wait before it may
//! be delivered" and keeps per-item history so callers can inspect or reset
//! it. The rate-limiting queue turns a positive answer into a delayed add.

pub mod bucket;
pub mod exponential;

use std::time::Duration;

pub use bucket::TokenBucketLimiter;
pub use exponential::ExponentialFailureLimiter;

/// Default token bucket refill rate, tokens per second.
pub const DEFAULT_RATE: f64 = 10.0;

/// Default token bucket capacity.
pub const DEFAULT_BURST: u32 = 100;

pub trait RateLimiter<T>: Send + Sync {
    /// Reserves admission for `item` and returns how long it must wait.
    /// `Duration::ZERO` means deliver now.
    fn when(&self, item: &T) -> Duration;

    /// Drops all history kept for `item`.
    fn forget(&self, item: &T);

    /// How many times `item` has been told to wait since the last `forget`.
    fn num_limit_times(&self, item: &T) -> u32;

    /// Releases limiter-owned resources. Called once by the owning queue.
    fn stop(&self) {}
}

/// Limiter that never delays anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NopLimiter;

impl<T> RateLimiter<T> for NopLimiter {
    fn when(&self, _item: &T) -> Duration {
        Duration::ZERO
    }

    fn forget(&self, _item: &T) {}

    fn num_limit_times(&self, _item: &T) -> u32 {
        0
    }
}
