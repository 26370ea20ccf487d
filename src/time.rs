//! Monotonic millisecond clock for heap deadlines.
//!
//! Deadlines are stored as `i64` heap keys, so time is expressed as
//! milliseconds since a process-wide origin captured on first use.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

static ORIGIN: OnceLock<Instant> = OnceLock::new();

/// Milliseconds elapsed since the clock origin.
#[inline]
pub fn now_ms() -> i64 {
    let origin = ORIGIN.get_or_init(Instant::now);
    origin.elapsed().as_millis() as i64
}

/// Deadline `delay` from now, saturating instead of overflowing.
#[inline]
pub fn deadline_after(delay: Duration) -> i64 {
    now_ms().saturating_add(as_millis_i64(delay))
}

/// Duration as whole milliseconds, rounding sub-millisecond delays up so a
/// positive delay never collapses to "due now".
#[inline]
pub fn as_millis_i64(d: Duration) -> i64 {
    let ms = d.as_millis();
    let ms = if ms == 0 && !d.is_zero() { 1 } else { ms };
    i64::try_from(ms).unwrap_or(i64::MAX)
}

/// Time remaining until `deadline`, zero if already due.
#[inline]
pub fn until(deadline: i64) -> Duration {
    let remaining = deadline.saturating_sub(now_ms());
    Duration::from_millis(remaining.max(0) as u64)
}
