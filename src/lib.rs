//! # workq
//!
//! In-process work queues with deduplication and at-most-one-in-flight
//! delivery per item identity.
//!
//! [`BaseQueue`] is the FIFO core. [`DelayScheduler`] delivers items after a
//! delay, [`PriorityScheduler`] delivers them in weight order per sort
//! window, and [`RateLimitingScheduler`] delays them as decided by a
//! [`RateLimiter`]. Every layer reports its operations through a
//! [`Callback`].

pub mod callback;
pub mod config;
pub mod container;
pub mod error;
pub mod limiter;
pub mod queue;
pub mod telemetry;
pub mod time;

pub use callback::{Callback, NopCallback};
pub use config::{Config, Options, RateLimitConfig};
pub use error::{Error, Result};
pub use limiter::{ExponentialFailureLimiter, NopLimiter, RateLimiter, TokenBucketLimiter};
pub use queue::{
    BaseQueue, DelayScheduler, DelayingQueue, Item, PriorityQueue, PriorityScheduler, Queue,
    RateLimitingQueue, RateLimitingScheduler,
};
