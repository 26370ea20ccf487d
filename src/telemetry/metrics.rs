//! Metric instrument factories for workq.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created from the `"workq"` meter. When no provider
//! is installed the global one is a no-op, so recording is always safe.

use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, Meter};

use crate::callback::Callback;

/// Returns the shared meter for workq instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("workq")
}

/// Counter: queue-level operations.
/// Labels: `queue`, `operation` ("add" | "get" | "done" | "add_after" |
/// "add_weight" | "add_limited" | "forget").
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("workq.queue.operations")
        .with_description("Number of queue operations")
        .build()
}

/// Histogram: requested delay of `add_after` calls, in milliseconds.
/// Labels: `queue`.
pub fn scheduled_delay_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("workq.delay.scheduled_ms")
        .with_description("Requested delay of delayed items")
        .with_unit("ms")
        .build()
}

/// Histogram: weight of `add_weight` calls.
/// Labels: `queue`.
pub fn item_weight() -> Histogram<u64> {
    meter()
        .u64_histogram("workq.priority.weight")
        .with_description("Weight of weighted items")
        .build()
}

/// Histogram: limiter attempt counts observed through `num_limit_times`.
/// Labels: `queue`.
pub fn limit_times() -> Histogram<u64> {
    meter()
        .u64_histogram("workq.limiter.times")
        .with_description("Rate limiter attempt counts per item")
        .build()
}

/// [`Callback`] that records every hook as an OTel measurement, labelled
/// with the queue's name.
pub struct MetricsCallback {
    queue: KeyValue,
    operations: Counter<u64>,
    delay_ms: Histogram<f64>,
    weight: Histogram<u64>,
    times: Histogram<u64>,
}

impl MetricsCallback {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: KeyValue::new("queue", queue.into()),
            operations: queue_operations(),
            delay_ms: scheduled_delay_ms(),
            weight: item_weight(),
            times: limit_times(),
        }
    }

    fn count(&self, operation: &'static str) {
        self.operations
            .add(1, &[self.queue.clone(), KeyValue::new("operation", operation)]);
    }
}

impl<T> Callback<T> for MetricsCallback {
    fn on_add(&self, _item: &T) {
        self.count("add");
    }

    fn on_get(&self, _item: &T) {
        self.count("get");
    }

    fn on_done(&self, _item: &T) {
        self.count("done");
    }

    fn on_add_after(&self, _item: &T, delay: Duration) {
        self.count("add_after");
        self.delay_ms
            .record(delay.as_secs_f64() * 1000.0, std::slice::from_ref(&self.queue));
    }

    fn on_add_weight(&self, _item: &T, weight: i64) {
        self.count("add_weight");
        self.weight
            .record(weight.max(0) as u64, std::slice::from_ref(&self.queue));
    }

    fn on_add_limited(&self, _item: &T) {
        self.count("add_limited");
    }

    fn on_forget(&self, _item: &T) {
        self.count("forget");
    }

    fn on_get_times(&self, _item: &T, times: u32) {
        self.times
            .record(u64::from(times), std::slice::from_ref(&self.queue));
    }
}
