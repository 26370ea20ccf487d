//! Delayed delivery.
//!
//! Items wait in a [`TimingHeap`] keyed by deadline. A background thread
//! moves every due item into the base queue, then sleeps until the next
//! deadline, a heartbeat, a wake from `add_after`, or shutdown, whichever
//! comes first.
//!
//! A due item whose identity is still waiting in the ready list cannot be
//! admitted. It is put back with a deadline of now + retry backoff rather
//! than dropped or retried on every pass.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded, select};
use parking_lot::{Mutex, Once};
use tracing::{debug, info, warn};

use super::base::{Admission, BaseQueue};
use super::{DelayingQueue, Item, Queue};
use crate::callback::Callback;
use crate::config::Options;
use crate::container::{Key, TimingHeap};
use crate::error::{Error, Result};
use crate::time;

/// Heap plus the handle of each waiting item, so a repeated `add_after`
/// reschedules the existing entry instead of adding another.
pub(crate) struct DelayState<T> {
    heap: TimingHeap<T>,
    waiting: HashMap<T, Key>,
}

impl<T: Item> DelayState<T> {
    fn new() -> Self {
        Self {
            heap: TimingHeap::new(),
            waiting: HashMap::new(),
        }
    }

    /// Schedules `item` at `deadline`, keeping the earlier deadline if the
    /// item is already waiting.
    fn schedule(&mut self, item: T, deadline: i64) -> Result<()> {
        match self.waiting.get(&item) {
            Some(&key) => {
                if self.heap.priority_of(key).is_some_and(|current| deadline < current) {
                    self.heap.update(key, deadline)?;
                }
            }
            None => {
                let key = self.heap.push(item.clone(), deadline);
                self.waiting.insert(item, key);
            }
        }
        Ok(())
    }

    fn pop_due(&mut self, now: i64) -> Option<T> {
        if self.heap.peek_min()? > now {
            return None;
        }
        let (item, _) = self.heap.pop_min()?;
        self.waiting.remove(&item);
        Some(item)
    }

    fn cancel(&mut self, item: &T) -> bool {
        match self.waiting.remove(item) {
            Some(key) => self.heap.delete(key).is_ok(),
            None => false,
        }
    }

    fn clear(&mut self) {
        self.heap.clear();
        self.waiting.clear();
    }
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

pub struct DelayScheduler<T: Item> {
    base: Arc<BaseQueue<T, DelayState<T>>>,
    wake_tx: Sender<()>,
    worker: Mutex<Option<Worker>>,
    stopped: Once,
}

impl<T: Item> DelayScheduler<T> {
    /// Starts the background loop. `options.limiter` is ignored.
    pub fn new(options: Options<T>) -> Result<Self> {
        let heartbeat = options.config.heartbeat();
        let backoff = options.config.retry_backoff();
        let base = Arc::new(BaseQueue::with_state(options.callback, DelayState::new()));

        let (stop_tx, stop_rx) = bounded(1);
        let (wake_tx, wake_rx) = bounded(1);

        let handle = {
            let base = Arc::clone(&base);
            thread::Builder::new()
                .name("workq-delay".to_string())
                .spawn(move || run_loop(&base, &stop_rx, &wake_rx, heartbeat, backoff))?
        };

        Ok(Self {
            base,
            wake_tx,
            worker: Mutex::new(Some(Worker { stop_tx, handle })),
            stopped: Once::new(),
        })
    }

    /// Removes `item` from the delay heap. Returns `false` if it was not
    /// waiting there (it may already have been delivered).
    pub fn cancel(&self, item: &T) -> bool {
        self.base.lock().sched.cancel(item)
    }

    /// Items waiting for their deadline.
    pub fn pending(&self) -> usize {
        self.base.lock().sched.heap.len()
    }

    pub async fn get_async(&self) -> Result<T> {
        self.base.get_async().await
    }

    pub(crate) fn callback(&self) -> &dyn Callback<T> {
        self.base.callback()
    }
}

impl<T: Item> Queue<T> for DelayScheduler<T> {
    fn add(&self, item: T) -> Result<()> {
        self.base.add(item)
    }

    fn get(&self) -> Result<T> {
        self.base.get()
    }

    fn get_blocking(&self) -> Result<T> {
        self.base.get_blocking()
    }

    fn done(&self, item: &T) {
        self.base.done(item)
    }

    fn len(&self) -> usize {
        self.base.len()
    }

    fn is_closed(&self) -> bool {
        self.base.is_closed()
    }

    fn stop(&self) {
        self.stopped.call_once(|| {
            if let Some(worker) = self.worker.lock().take() {
                let _ = worker.stop_tx.send(());
                if worker.handle.join().is_err() {
                    warn!("delay loop panicked before shutdown");
                }
            }
            self.base.stop();
            self.base.lock().sched.clear();
            info!("delay scheduler stopped");
        });
    }
}

impl<T: Item> DelayingQueue<T> for DelayScheduler<T> {
    fn add_after(&self, item: T, delay: Duration) -> Result<()> {
        if delay.is_zero() {
            return self.base.add(item);
        }

        let deadline = time::deadline_after(delay);
        {
            let mut core = self.base.lock();
            if core.is_closed() {
                return Err(Error::Closed);
            }
            core.sched.schedule(item.clone(), deadline)?;
        }
        // A full channel already has a wake pending.
        let _ = self.wake_tx.try_send(());

        self.base.callback().on_add_after(&item, delay);
        Ok(())
    }
}

impl<T: Item> Drop for DelayScheduler<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop<T: Item>(
    base: &BaseQueue<T, DelayState<T>>,
    stop_rx: &Receiver<()>,
    wake_rx: &Receiver<()>,
    heartbeat: Duration,
    backoff: Duration,
) {
    debug!(
        heartbeat_ms = heartbeat.as_millis() as u64,
        backoff_ms = backoff.as_millis() as u64,
        "delay loop started"
    );
    let backoff_ms = time::as_millis_i64(backoff);

    loop {
        let (admitted, next_deadline) = deliver_due(base, backoff_ms);
        for (item, admission) in &admitted {
            base.announce(item, *admission);
        }

        let wait = next_deadline.map_or(heartbeat, |deadline| time::until(deadline).min(heartbeat));
        let shutdown = select! {
            recv(stop_rx) -> _ => true,
            recv(wake_rx) -> msg => msg.is_err(),
            default(wait) => false,
        };
        if shutdown {
            break;
        }
    }

    debug!("delay loop stopped");
}

/// Moves every due item into the ready list under one lock hold. Returns
/// the admitted items and the next deadline still in the heap.
fn deliver_due<T: Item>(
    base: &BaseQueue<T, DelayState<T>>,
    backoff_ms: i64,
) -> (Vec<(T, Admission)>, Option<i64>) {
    let mut admitted = Vec::new();
    let mut core = base.lock();
    let now = time::now_ms();

    while let Some(item) = core.sched.pop_due(now) {
        match core.insert(item.clone()) {
            Ok(admission) => admitted.push((item, admission)),
            Err(Error::AlreadyExists) => {
                debug!(backoff_ms, "delayed item still queued, retrying after backoff");
                // Deadline is in the future, so this pass will not pop it again.
                if let Err(e) = core.sched.schedule(item, now.saturating_add(backoff_ms)) {
                    warn!(error = %e, "failed to reschedule delayed item");
                }
            }
            Err(_) => break,
        }
    }

    let next = core.sched.heap.peek_min();
    (admitted, next)
}
