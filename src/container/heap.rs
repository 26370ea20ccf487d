//! Min-heap keyed by `i64` priority with O(log n) removal by handle.
//!
//! Elements live in a [`Pool`] and embed their own position in the heap
//! order vector, so [`TimingHeap::delete`] and [`TimingHeap::update`] find
//! an element without scanning. The same container backs delayed delivery
//! (priority = deadline in ms) and weighted delivery (priority = weight):
//! in both cases the smallest key pops first. Equal keys pop in no
//! particular order.

use super::pool::{Key, Pool};
use crate::error::{Error, Result};

#[derive(Debug)]
struct Element<T> {
    item: T,
    priority: i64,
    /// Current position in `TimingHeap::order`.
    pos: usize,
}

#[derive(Debug)]
pub struct TimingHeap<T> {
    elements: Pool<Element<T>>,
    order: Vec<Key>,
}

impl<T> Default for TimingHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimingHeap<T> {
    pub const fn new() -> Self {
        Self {
            elements: Pool::new(),
            order: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Inserts `item` and returns a handle usable with `delete`/`update`.
    pub fn push(&mut self, item: T, priority: i64) -> Key {
        let pos = self.order.len();
        let key = self.elements.acquire(Element {
            item,
            priority,
            pos,
        });
        self.order.push(key);
        self.sift_up(pos);
        key
    }

    /// Smallest priority currently queued.
    pub fn peek_min(&self) -> Option<i64> {
        self.order.first().map(|&key| self.elements[key].priority)
    }

    pub fn pop_min(&mut self) -> Option<(T, i64)> {
        let &key = self.order.first()?;
        self.remove_at(key)
    }

    /// Removes the element behind `handle`.
    ///
    /// A handle whose element already left the heap yields
    /// [`Error::NilElement`].
    pub fn delete(&mut self, handle: Key) -> Result<(T, i64)> {
        if !self.elements.contains(handle) {
            return Err(Error::NilElement);
        }
        self.remove_at(handle).ok_or(Error::NilElement)
    }

    /// Moves the element behind `handle` to `priority`, in either direction.
    pub fn update(&mut self, handle: Key, priority: i64) -> Result<()> {
        let element = self.elements.get_mut(handle).ok_or(Error::NilElement)?;
        let old = element.priority;
        element.priority = priority;
        let pos = element.pos;

        if priority < old {
            self.sift_up(pos);
        } else if priority > old {
            self.sift_down(pos);
        }
        Ok(())
    }

    pub fn priority_of(&self, handle: Key) -> Option<i64> {
        self.elements.get(handle).map(|e| e.priority)
    }

    pub fn get(&self, handle: Key) -> Option<&T> {
        self.elements.get(handle).map(|e| &e.item)
    }

    /// All elements ordered by ascending priority. The heap is unchanged.
    pub fn snapshot(&self) -> Vec<(T, i64)>
    where
        T: Clone,
    {
        let mut all: Vec<_> = self
            .order
            .iter()
            .map(|&key| {
                let e = &self.elements[key];
                (e.item.clone(), e.priority)
            })
            .collect();
        all.sort_by_key(|&(_, priority)| priority);
        all
    }

    /// Drops every element. Outstanding handles become stale.
    pub fn clear(&mut self) {
        self.order.clear();
        self.elements.clear();
    }

    fn remove_at(&mut self, key: Key) -> Option<(T, i64)> {
        let element = self.elements.release(key)?;
        let pos = element.pos;

        let last = self.order.pop().expect("heap order out of sync with elements");
        if pos < self.order.len() {
            self.order[pos] = last;
            self.elements[last].pos = pos;
            self.sift_down(pos);
            self.sift_up(pos);
        }

        Some((element.item, element.priority))
    }

    #[inline]
    fn priority_at(&self, pos: usize) -> i64 {
        self.elements[self.order[pos]].priority
    }

    #[inline]
    fn swap(&mut self, a: usize, b: usize) {
        self.order.swap(a, b);
        let (ka, kb) = (self.order[a], self.order[b]);
        self.elements[ka].pos = a;
        self.elements[kb].pos = b;
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.priority_at(pos) >= self.priority_at(parent) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.order.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let smaller = if right < len && self.priority_at(right) < self.priority_at(left) {
                right
            } else {
                left
            };
            if self.priority_at(smaller) >= self.priority_at(pos) {
                break;
            }
            self.swap(pos, smaller);
            pos = smaller;
        }
    }
}
