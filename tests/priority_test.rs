//! Integration tests for weighted delivery.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use workq::{Config, Error, Options, PriorityQueue, PriorityScheduler, Queue};

fn scheduler<T: workq::Item>(window_ms: u64) -> PriorityScheduler<T> {
    let config = Config {
        sort_window_ms: window_ms,
        ..Config::default()
    };
    PriorityScheduler::new(Options::from(config)).unwrap()
}

#[test]
fn lighter_items_are_delivered_first_within_a_window() {
    let q = scheduler(200);
    q.add_weight("heavy", 5).unwrap();
    q.add_weight("medium", 3).unwrap();
    q.add_weight("light", 1).unwrap();

    assert_eq!(q.get_blocking().unwrap(), "light");
    assert_eq!(q.get_blocking().unwrap(), "medium");
    assert_eq!(q.get_blocking().unwrap(), "heavy");
    assert_eq!(q.pending(), 0);
}

#[test]
fn weighted_items_wait_for_the_window() {
    let q = scheduler(200);
    q.add_weight(1u32, 4).unwrap();
    assert_eq!(q.pending(), 1);
    assert!(matches!(q.get(), Err(Error::Empty)));

    assert_eq!(q.get_blocking().unwrap(), 1);
}

#[test]
fn non_positive_weight_adds_immediately() {
    let q = scheduler(200);
    q.add_weight("zero", 0).unwrap();
    q.add_weight("negative", -3).unwrap();
    assert_eq!(q.pending(), 0);
    assert_eq!(q.len(), 2);
    assert_eq!(q.get().unwrap(), "zero");
    assert_eq!(q.get().unwrap(), "negative");
}

#[test]
fn weighted_duplicate_of_queued_item_waits_for_a_later_window() {
    let q = scheduler(30);
    q.add("x").unwrap();
    q.add_weight("x", 2).unwrap();

    thread::sleep(Duration::from_millis(100));
    assert_eq!(q.len(), 1);
    assert_eq!(q.pending(), 1);

    assert_eq!(q.get().unwrap(), "x");
    q.done(&"x");
    assert_eq!(q.get_blocking().unwrap(), "x");
}

#[test]
fn reweighted_item_is_delivered_once() {
    let q = scheduler(100);
    q.add_weight("x", 5).unwrap();
    q.add_weight("x", 3).unwrap();
    assert_eq!(q.pending(), 1);

    assert_eq!(q.get_blocking().unwrap(), "x");
    q.done(&"x");

    thread::sleep(Duration::from_millis(250));
    assert_eq!(q.len(), 0);
    assert_eq!(q.pending(), 0);
    assert!(matches!(q.get(), Err(Error::Empty)));
}

#[test]
fn stop_discards_pending_and_rejects_new_items() {
    let q = scheduler(10_000);
    q.add_weight("x", 1).unwrap();
    q.stop();

    assert!(q.is_closed());
    assert_eq!(q.pending(), 0);
    assert!(matches!(q.add_weight("y", 1), Err(Error::Closed)));
    assert!(matches!(q.add_weight("y", 0), Err(Error::Closed)));
}

#[test]
fn stop_wakes_blocked_consumer() {
    let q: Arc<PriorityScheduler<u32>> = Arc::new(scheduler(50));
    let consumer = {
        let q = Arc::clone(&q);
        thread::spawn(move || q.get_blocking())
    };

    thread::sleep(Duration::from_millis(30));
    q.stop();
    assert!(matches!(consumer.join().unwrap(), Err(Error::Closed)));
}
