//! Integration tests for the dedup FIFO core.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use workq::{BaseQueue, Callback, Error, Queue};

#[derive(Default)]
struct Counting {
    adds: AtomicUsize,
    gets: AtomicUsize,
    dones: AtomicUsize,
}

impl<T> Callback<T> for Counting {
    fn on_add(&self, _item: &T) {
        self.adds.fetch_add(1, Ordering::SeqCst);
    }

    fn on_get(&self, _item: &T) {
        self.gets.fetch_add(1, Ordering::SeqCst);
    }

    fn on_done(&self, _item: &T) {
        self.dones.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Ordering and dedup
// ---------------------------------------------------------------------------

#[test]
fn delivers_in_insertion_order() {
    let q = BaseQueue::new();
    for i in 0..5 {
        q.add(i).unwrap();
    }
    assert_eq!(q.len(), 5);

    let got: Vec<i32> = (0..5).map(|_| q.get().unwrap()).collect();
    assert_eq!(got, vec![0, 1, 2, 3, 4]);
    assert!(matches!(q.get(), Err(Error::Empty)));
}

#[test]
fn duplicate_add_is_rejected_while_waiting() {
    let q = BaseQueue::new();
    q.add("x").unwrap();
    assert!(matches!(q.add("x"), Err(Error::AlreadyExists)));
    assert_eq!(q.len(), 1);

    assert_eq!(q.get().unwrap(), "x");
    assert!(matches!(q.get(), Err(Error::Empty)));
}

#[test]
fn item_readded_while_processing_is_redelivered_after_done() {
    let q = BaseQueue::new();
    q.add("x").unwrap();
    assert_eq!(q.get().unwrap(), "x");

    // Accepted, but never handed to a second consumer concurrently.
    q.add("x").unwrap();
    assert_eq!(q.len(), 0);
    assert!(matches!(q.get(), Err(Error::Empty)));
    assert!(matches!(q.add("x"), Err(Error::AlreadyExists)));

    q.done(&"x");
    assert_eq!(q.len(), 1);
    assert_eq!(q.get().unwrap(), "x");
    q.done(&"x");
    assert!(q.is_empty());
}

#[test]
fn done_without_readd_does_not_redeliver() {
    let q = BaseQueue::new();
    q.add(7).unwrap();
    assert_eq!(q.get().unwrap(), 7);
    q.done(&7);
    assert!(matches!(q.get(), Err(Error::Empty)));

    // Identity is free again.
    q.add(7).unwrap();
    assert_eq!(q.get().unwrap(), 7);
}

#[test]
fn done_for_unknown_item_is_harmless() {
    let q: BaseQueue<&str> = BaseQueue::new();
    q.done(&"ghost");
    assert!(q.is_empty());
}

// ---------------------------------------------------------------------------
// Stop
// ---------------------------------------------------------------------------

#[test]
fn stop_closes_and_drains() {
    let q = BaseQueue::new();
    q.add(1).unwrap();
    q.add(2).unwrap();

    q.stop();
    assert!(q.is_closed());
    assert_eq!(q.len(), 0);
    assert!(matches!(q.add(3), Err(Error::Closed)));
    assert!(matches!(q.get(), Err(Error::Closed)));
    assert!(matches!(q.get_blocking(), Err(Error::Closed)));

    // Idempotent.
    q.stop();
    assert!(q.is_closed());
}

#[test]
fn stop_wakes_blocked_consumers() {
    let q: Arc<BaseQueue<u32>> = Arc::new(BaseQueue::new());

    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let q = Arc::clone(&q);
            thread::spawn(move || q.get_blocking())
        })
        .collect();

    thread::sleep(Duration::from_millis(50));
    q.stop();

    for handle in consumers {
        assert!(matches!(handle.join().unwrap(), Err(Error::Closed)));
    }
}

// ---------------------------------------------------------------------------
// Blocking and concurrent consumers
// ---------------------------------------------------------------------------

#[test]
fn blocking_get_wakes_on_add() {
    let q: Arc<BaseQueue<&str>> = Arc::new(BaseQueue::new());
    let consumer = {
        let q = Arc::clone(&q);
        thread::spawn(move || q.get_blocking())
    };

    thread::sleep(Duration::from_millis(30));
    q.add("job").unwrap();

    assert_eq!(consumer.join().unwrap().unwrap(), "job");
}

#[test]
fn concurrent_consumers_see_each_item_once() {
    let q: Arc<BaseQueue<u32>> = Arc::new(BaseQueue::new());
    for i in 0..200 {
        q.add(i).unwrap();
    }

    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let q = Arc::clone(&q);
            thread::spawn(move || {
                let mut seen = Vec::new();
                while let Ok(item) = q.get() {
                    seen.push(item);
                    q.done(&item);
                }
                seen
            })
        })
        .collect();

    let mut all = Vec::new();
    for handle in consumers {
        all.extend(handle.join().unwrap());
    }
    assert_eq!(all.len(), 200);
    let unique: HashSet<u32> = all.into_iter().collect();
    assert_eq!(unique.len(), 200);
}

#[tokio::test]
async fn async_get_waits_for_add() {
    let q: Arc<BaseQueue<u32>> = Arc::new(BaseQueue::new());
    let consumer = {
        let q = Arc::clone(&q);
        tokio::spawn(async move { q.get_async().await })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    q.add(42).unwrap();

    assert_eq!(consumer.await.unwrap().unwrap(), 42);
}

#[tokio::test]
async fn async_get_returns_closed_on_stop() {
    let q: Arc<BaseQueue<u32>> = Arc::new(BaseQueue::new());
    let consumer = {
        let q = Arc::clone(&q);
        tokio::spawn(async move { q.get_async().await })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    q.stop();

    assert!(matches!(consumer.await.unwrap(), Err(Error::Closed)));
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

#[test]
fn callbacks_fire_for_accepted_operations_only() {
    let counting = Arc::new(Counting::default());
    let q: BaseQueue<&str> = BaseQueue::with_callback(counting.clone());

    q.add("a").unwrap();
    let _ = q.add("a");
    let item = q.get().unwrap();
    q.done(&item);
    let _ = q.get();

    assert_eq!(counting.adds.load(Ordering::SeqCst), 1);
    assert_eq!(counting.gets.load(Ordering::SeqCst), 1);
    assert_eq!(counting.dones.load(Ordering::SeqCst), 1);
}

#[derive(Default)]
struct Reentrant {
    queue: OnceLock<Weak<BaseQueue<u32>>>,
    seen_len: AtomicUsize,
}

impl Callback<u32> for Reentrant {
    fn on_add(&self, _item: &u32) {
        if let Some(queue) = self.queue.get().and_then(Weak::upgrade) {
            self.seen_len.store(queue.len(), Ordering::SeqCst);
        }
    }
}

#[test]
fn hooks_run_unlocked_and_may_call_back_into_the_queue() {
    let hook = Arc::new(Reentrant::default());
    let q: Arc<BaseQueue<u32>> = Arc::new(BaseQueue::with_callback(hook.clone()));
    hook.queue.set(Arc::downgrade(&q)).unwrap();

    q.add(1).unwrap();
    q.add(2).unwrap();

    // Each on_add sees its own item already linked.
    assert_eq!(hook.seen_len.load(Ordering::SeqCst), 2);
}
