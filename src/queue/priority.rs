//! Weighted delivery in sort windows.
//!
//! Weighted items collect in a [`TimingHeap`] keyed by weight. Once per sort
//! window the background thread takes the whole heap, empties it, and admits
//! the batch into the base queue in ascending weight order. Items that are
//! still waiting in the ready list go back into the heap for the next
//! window. Latency is up to one window; in exchange each batch is sorted
//! once instead of timing every item individually.
//!
//! An item weighted again before its window closes keeps one heap entry at
//! the lower of its weights.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded, select, tick};
use parking_lot::{Mutex, Once};
use tracing::{debug, info, warn};

use super::base::{Admission, BaseQueue};
use super::{Item, PriorityQueue, Queue};
use crate::config::Options;
use crate::container::{Key, TimingHeap};
use crate::error::{Error, Result};

/// Weight heap plus the handle of each waiting item.
pub(crate) struct WeightState<T> {
    heap: TimingHeap<T>,
    waiting: HashMap<T, Key>,
}

impl<T: Item> WeightState<T> {
    fn new() -> Self {
        Self {
            heap: TimingHeap::new(),
            waiting: HashMap::new(),
        }
    }

    /// Queues `item` at `weight`, keeping the lower weight if it is
    /// already waiting.
    fn schedule(&mut self, item: T, weight: i64) -> Result<()> {
        match self.waiting.get(&item) {
            Some(&key) => {
                if self.heap.priority_of(key).is_some_and(|current| weight < current) {
                    self.heap.update(key, weight)?;
                }
            }
            None => {
                let key = self.heap.push(item.clone(), weight);
                self.waiting.insert(item, key);
            }
        }
        Ok(())
    }

    /// Every waiting item in ascending weight order, leaving the state empty.
    fn take_batch(&mut self) -> Vec<(T, i64)> {
        let batch = self.heap.snapshot();
        self.clear();
        batch
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

pub struct PriorityScheduler<T: Item> {
    base: Arc<BaseQueue<T, WeightState<T>>>,
    worker: Mutex<Option<Worker>>,
    stopped: Once,
}

impl<T: Item> PriorityScheduler<T> {
    /// Starts the background loop. `options.limiter` is ignored.
    pub fn new(options: Options<T>) -> Result<Self> {
        let window = options.config.sort_window();
        let base = Arc::new(BaseQueue::with_state(options.callback, WeightState::new()));
        let (stop_tx, stop_rx) = bounded(1);

        let handle = {
            let base = Arc::clone(&base);
            thread::Builder::new()
                .name("workq-priority".to_string())
                .spawn(move || run_loop(&base, &stop_rx, window))?
        };

        Ok(Self {
            base,
            worker: Mutex::new(Some(Worker { stop_tx, handle })),
            stopped: Once::new(),
        })
    }

    /// Items waiting for the next sort window.
    pub fn pending(&self) -> usize {
        self.base.lock().sched.heap.len()
    }

    pub async fn get_async(&self) -> Result<T> {
        self.base.get_async().await
    }
}

impl<T: Item> Queue<T> for PriorityScheduler<T> {
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
                    warn!("priority loop panicked before shutdown");
                }
            }
            self.base.stop();
            self.base.lock().sched.clear();
            info!("priority scheduler stopped");
        });
    }
}

impl<T: Item> PriorityQueue<T> for PriorityScheduler<T> {
    fn add_weight(&self, item: T, weight: i64) -> Result<()> {
        if weight <= 0 {
            return self.base.add(item);
        }

        {
            let mut core = self.base.lock();
            if core.is_closed() {
                return Err(Error::Closed);
            }
            core.sched.schedule(item.clone(), weight)?;
        }

        self.base.callback().on_add_weight(&item, weight);
        Ok(())
    }
}

impl<T: Item> Drop for PriorityScheduler<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop<T: Item>(
    base: &BaseQueue<T, WeightState<T>>,
    stop_rx: &Receiver<()>,
    window: Duration,
) {
    debug!(window_ms = window.as_millis() as u64, "priority loop started");
    let ticker = tick(window);

    loop {
        let shutdown = select! {
            recv(stop_rx) -> _ => true,
            recv(ticker) -> _ => false,
        };
        if shutdown {
            break;
        }

        for (item, admission) in &flush(base) {
            base.announce(item, *admission);
        }
    }

    debug!("priority loop stopped");
}

/// Admits the whole heap in weight order under one lock hold.
fn flush<T: Item>(base: &BaseQueue<T, WeightState<T>>) -> Vec<(T, Admission)> {
    let mut core = base.lock();
    if core.is_closed() || core.sched.heap.is_empty() {
        return Vec::new();
    }

    let batch = core.sched.take_batch();

    let mut admitted = Vec::with_capacity(batch.len());
    let mut deferred = 0usize;
    for (item, weight) in batch {
        match core.insert(item.clone()) {
            Ok(admission) => admitted.push((item, admission)),
            Err(Error::AlreadyExists) => {
                if let Err(e) = core.sched.schedule(item, weight) {
                    warn!(error = %e, "failed to keep weighted item for next window");
                }
                deferred += 1;
            }
            Err(_) => break,
        }
    }

    if deferred > 0 {
        debug!(deferred, "weighted items still queued, kept for next window");
    }
    admitted
}
