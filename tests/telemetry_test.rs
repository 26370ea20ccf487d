//! Integration tests for telemetry initialization and the metrics callback.

use std::sync::Arc;
use std::time::Duration;

use workq::telemetry::metrics::MetricsCallback;
use workq::{
    BaseQueue, DelayScheduler, DelayingQueue, Options, PriorityQueue, PriorityScheduler, Queue,
};

#[test]
fn telemetry_initializes_without_endpoint() {
    // A global subscriber can be set once per process; a second init in the
    // same binary returns Err, which is fine here.
    let config = workq::telemetry::TelemetryConfig {
        endpoint: None,
        service_name: "workq-test".to_string(),
    };
    if let Ok(guard) = workq::telemetry::init_telemetry(config) {
        assert!(!guard.is_exporting());
        guard.force_flush();
    }
}

#[test]
fn metrics_callback_records_without_a_provider() {
    let q: BaseQueue<u32> = BaseQueue::with_callback(Arc::new(MetricsCallback::new("base")));
    q.add(1).unwrap();
    let item = q.get().unwrap();
    q.done(&item);
    q.stop();
}

#[test]
fn metrics_callback_observes_scheduler_hooks() {
    let delayed: Options<&str> = Options {
        callback: Arc::new(MetricsCallback::new("delayed")),
        ..Options::default()
    };
    let q = DelayScheduler::new(delayed).unwrap();
    q.add_after("x", Duration::from_millis(5)).unwrap();
    q.stop();

    let weighted: Options<&str> = Options {
        callback: Arc::new(MetricsCallback::new("weighted")),
        ..Options::default()
    };
    let q = PriorityScheduler::new(weighted).unwrap();
    q.add_weight("y", 3).unwrap();
    q.stop();
}
