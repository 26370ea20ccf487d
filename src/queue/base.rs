//! The dedup-tracking FIFO every other layer delivers into.
//!
//! Per item identity:
//!
//! ```text
//! absent ──add──▶ dirty ──get──▶ processing ──done──▶ absent
//!                                   │  ▲
//!                                 add  done (re-linked, back to dirty)
//!                                   ▼  │
//!                           dirty + processing
//! ```
//!
//! An identity is linked into the ready list at most once, and never while
//! a consumer holds it. Re-adding a processing identity only marks it dirty;
//! the matching `done` links it back so it is delivered again.

use std::pin::pin;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, MutexGuard, Once};
use tokio::sync::Notify;
use tracing::debug;

use super::{Item, Queue};
use crate::callback::{Callback, NopCallback};
use crate::container::{DedupSet, Deque};
use crate::error::{Error, Result};

/// Outcome of an accepted add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    /// Linked into the ready list; a consumer should be woken.
    Ready,
    /// Marked dirty while a consumer holds it; linked again on `done`.
    Deferred,
}

/// State guarded by the queue mutex. `S` is whatever a scheduler layer needs
/// to mutate atomically with the ready list.
pub(crate) struct Core<T, S> {
    ready: Deque<T>,
    dirty: DedupSet<T>,
    processing: DedupSet<T>,
    closed: bool,
    pub(crate) sched: S,
}

impl<T: Item, S> Core<T, S> {
    fn new(sched: S) -> Self {
        Self {
            ready: Deque::new(),
            dirty: DedupSet::new(),
            processing: DedupSet::new(),
            closed: false,
            sched,
        }
    }

    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn insert(&mut self, item: T) -> Result<Admission> {
        if self.closed {
            return Err(Error::Closed);
        }
        if self.dirty.contains(&item) {
            return Err(Error::AlreadyExists);
        }

        if self.processing.contains(&item) {
            self.dirty.insert(item);
            return Ok(Admission::Deferred);
        }

        self.dirty.insert(item.clone());
        self.ready.push_back(item);
        Ok(Admission::Ready)
    }

    fn take(&mut self) -> Option<T> {
        let item = self.ready.pop_front()?;
        self.dirty.remove(&item);
        self.processing.insert(item.clone());
        Some(item)
    }

    /// Returns `true` when a deferred re-add was linked back in.
    fn finish(&mut self, item: &T) -> bool {
        self.processing.remove(item);
        if !self.closed && self.dirty.contains(item) {
            self.ready.push_back(item.clone());
            return true;
        }
        false
    }
}

pub struct BaseQueue<T, S = ()> {
    core: Mutex<Core<T, S>>,
    ready_cv: Condvar,
    ready_notify: Notify,
    callback: Arc<dyn Callback<T>>,
    stopped: Once,
}

impl<T: Item> BaseQueue<T> {
    pub fn new() -> Self {
        Self::with_callback(Arc::new(NopCallback))
    }

    pub fn with_callback(callback: Arc<dyn Callback<T>>) -> Self {
        Self::with_state(callback, ())
    }
}

impl<T: Item> Default for BaseQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Item, S> BaseQueue<T, S> {
    pub(crate) fn with_state(callback: Arc<dyn Callback<T>>, sched: S) -> Self {
        Self {
            core: Mutex::new(Core::new(sched)),
            ready_cv: Condvar::new(),
            ready_notify: Notify::new(),
            callback,
            stopped: Once::new(),
        }
    }

    #[inline]
    pub(crate) fn lock(&self) -> MutexGuard<'_, Core<T, S>> {
        self.core.lock()
    }

    #[inline]
    pub(crate) fn callback(&self) -> &dyn Callback<T> {
        self.callback.as_ref()
    }

    /// Fires `on_add` and wakes a consumer for an item admitted under the
    /// lock. Must be called after the lock is released.
    pub(crate) fn announce(&self, item: &T, admission: Admission) {
        self.callback.on_add(item);
        if admission == Admission::Ready {
            self.wake_one();
        }
    }

    fn wake_one(&self) {
        self.ready_cv.notify_one();
        self.ready_notify.notify_one();
    }
}

impl<T: Item, S: Send> BaseQueue<T, S> {
    /// Async counterpart of [`Queue::get_blocking`].
    pub async fn get_async(&self) -> Result<T> {
        loop {
            // Arm before checking so a wake between check and await is kept.
            let mut notified = pin!(self.ready_notify.notified());
            notified.as_mut().enable();

            match self.get() {
                Err(Error::Empty) => {}
                other => return other,
            }
            notified.await;
        }
    }
}

impl<T: Item, S: Send> Queue<T> for BaseQueue<T, S> {
    fn add(&self, item: T) -> Result<()> {
        let admission = self.lock().insert(item.clone())?;
        self.announce(&item, admission);
        Ok(())
    }

    fn get(&self) -> Result<T> {
        let mut core = self.lock();
        if core.closed {
            return Err(Error::Closed);
        }
        let item = core.take().ok_or(Error::Empty)?;
        drop(core);

        self.callback.on_get(&item);
        Ok(item)
    }

    fn get_blocking(&self) -> Result<T> {
        let mut core = self.lock();
        let item = loop {
            if core.closed {
                return Err(Error::Closed);
            }
            if let Some(item) = core.take() {
                break item;
            }
            self.ready_cv.wait(&mut core);
        };
        drop(core);

        self.callback.on_get(&item);
        Ok(item)
    }

    fn done(&self, item: &T) {
        let relinked = self.lock().finish(item);
        if relinked {
            self.wake_one();
        }
        self.callback.on_done(item);
    }

    fn len(&self) -> usize {
        self.lock().ready.len()
    }

    fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn stop(&self) {
        self.stopped.call_once(|| {
            {
                let mut core = self.lock();
                core.closed = true;
                core.ready.clear();
                core.dirty.clear();
                core.processing.clear();
            }
            self.ready_cv.notify_all();
            self.ready_notify.notify_waiters();
            debug!("queue stopped");
        });
    }
}
