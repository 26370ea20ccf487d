//! Token bucket with reservation semantics.
//!
//! Every call to `when` takes one token, even when none is available: the
//! balance goes negative and the returned wait is the time the refill needs
//! to pay that debt back. Consecutive excess requests therefore queue up at
//! `1 / rate` second intervals instead of all retrying at once.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::{DEFAULT_BURST, DEFAULT_RATE, RateLimiter};

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct TokenBucketLimiter<T> {
    rate: f64,
    burst: u32,
    bucket: Mutex<Bucket>,
    limited: Mutex<HashMap<T, u32>>,
}

impl<T> Default for TokenBucketLimiter<T> {
    fn default() -> Self {
        Self::new(DEFAULT_RATE, DEFAULT_BURST)
    }
}

impl<T> TokenBucketLimiter<T> {
    /// Bucket refilling `rate` tokens per second, holding at most `burst`.
    /// Starts full.
    pub fn new(rate: f64, burst: u32) -> Self {
        Self {
            rate: if rate.is_finite() { rate.max(0.0) } else { 0.0 },
            burst,
            bucket: Mutex::new(Bucket {
                tokens: f64::from(burst),
                last_refill: Instant::now(),
            }),
            limited: Mutex::new(HashMap::new()),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    /// Current balance; negative while reservations are outstanding.
    pub fn tokens(&self) -> f64 {
        let mut bucket = self.bucket.lock();
        self.refill(&mut bucket, Instant::now());
        bucket.tokens
    }

    /// Takes one token and returns the wait until it is covered.
    pub fn reserve(&self) -> Duration {
        self.reserve_at(Instant::now())
    }

    fn reserve_at(&self, now: Instant) -> Duration {
        let mut bucket = self.bucket.lock();
        self.refill(&mut bucket, now);
        bucket.tokens -= 1.0;

        if bucket.tokens >= 0.0 {
            Duration::ZERO
        } else if self.rate == 0.0 {
            Duration::MAX
        } else {
            // A tiny rate can push the wait past what Duration holds.
            Duration::try_from_secs_f64(-bucket.tokens / self.rate).unwrap_or(Duration::MAX)
        }
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        let refilled = bucket.tokens + elapsed.as_secs_f64() * self.rate;
        bucket.tokens = refilled.min(f64::from(self.burst));
        bucket.last_refill = now;
    }
}

impl<T> RateLimiter<T> for TokenBucketLimiter<T>
where
    T: Eq + Hash + Clone + Send + Sync,
{
    fn when(&self, item: &T) -> Duration {
        let delay = self.reserve();
        if !delay.is_zero() {
            *self.limited.lock().entry(item.clone()).or_insert(0) += 1;
        }
        delay
    }

    fn forget(&self, item: &T) {
        self.limited.lock().remove(item);
    }

    fn num_limit_times(&self, item: &T) -> u32 {
        self.limited.lock().get(item).copied().unwrap_or(0)
    }

    fn stop(&self) {
        self.limited.lock().clear();
    }
}
