//! Rate-limited delivery on top of [`DelayScheduler`].
//!
//! The limiter decides how long each item waits; the delay scheduler does
//! the waiting.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Once;
use tracing::info;

use super::{DelayScheduler, DelayingQueue, Item, Queue, RateLimitingQueue};
use crate::config::Options;
use crate::error::Result;
use crate::limiter::{RateLimiter, TokenBucketLimiter};

pub struct RateLimitingScheduler<T: Item> {
    delaying: DelayScheduler<T>,
    limiter: Arc<dyn RateLimiter<T>>,
    stopped: Once,
}

impl<T: Item> RateLimitingScheduler<T> {
    /// Uses `options.limiter`, or a token bucket built from
    /// `options.config.rate_limit` when none is given.
    pub fn new(mut options: Options<T>) -> Result<Self> {
        let limiter: Arc<dyn RateLimiter<T>> = match options.limiter.take() {
            Some(limiter) => limiter,
            None => {
                let rate_limit = &options.config.rate_limit;
                Arc::new(TokenBucketLimiter::<T>::new(rate_limit.rate, rate_limit.burst))
            }
        };
        Ok(Self {
            delaying: DelayScheduler::new(options)?,
            limiter,
            stopped: Once::new(),
        })
    }

    pub fn limiter(&self) -> &dyn RateLimiter<T> {
        self.limiter.as_ref()
    }

    /// Items waiting out their rate-limit delay.
    pub fn pending(&self) -> usize {
        self.delaying.pending()
    }

    pub async fn get_async(&self) -> Result<T> {
        self.delaying.get_async().await
    }
}

impl<T: Item> Queue<T> for RateLimitingScheduler<T> {
    fn add(&self, item: T) -> Result<()> {
        self.delaying.add(item)
    }

    fn get(&self) -> Result<T> {
        self.delaying.get()
    }

    fn get_blocking(&self) -> Result<T> {
        self.delaying.get_blocking()
    }

    fn done(&self, item: &T) {
        self.delaying.done(item)
    }

    fn len(&self) -> usize {
        self.delaying.len()
    }

    fn is_closed(&self) -> bool {
        self.delaying.is_closed()
    }

    fn stop(&self) {
        self.stopped.call_once(|| {
            self.limiter.stop();
            self.delaying.stop();
            info!("rate limiting scheduler stopped");
        });
    }
}

impl<T: Item> DelayingQueue<T> for RateLimitingScheduler<T> {
    fn add_after(&self, item: T, delay: Duration) -> Result<()> {
        self.delaying.add_after(item, delay)
    }
}

impl<T: Item> RateLimitingQueue<T> for RateLimitingScheduler<T> {
    fn add_limited(&self, item: T) -> Result<()> {
        let delay = self.limiter.when(&item);
        let result = self.delaying.add_after(item.clone(), delay);
        self.delaying.callback().on_add_limited(&item);
        result
    }

    fn forget(&self, item: &T) {
        self.limiter.forget(item);
        self.delaying.callback().on_forget(item);
    }

    fn num_limit_times(&self, item: &T) -> u32 {
        let times = self.limiter.num_limit_times(item);
        self.delaying.callback().on_get_times(item, times);
        times
    }
}

impl<T: Item> Drop for RateLimitingScheduler<T> {
    fn drop(&mut self) {
        self.stop();
    }
}
