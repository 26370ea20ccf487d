//! Identity set used for the dirty/processing bookkeeping.

use std::collections::HashSet;
use std::hash::Hash;

#[derive(Debug)]
pub struct DedupSet<T> {
    inner: HashSet<T>,
}

impl<T> Default for DedupSet<T> {
    fn default() -> Self {
        Self {
            inner: HashSet::new(),
        }
    }
}

impl<T: Eq + Hash> DedupSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the identity was already present.
    #[inline]
    pub fn insert(&mut self, item: T) -> bool {
        self.inner.insert(item)
    }

    #[inline]
    pub fn remove(&mut self, item: &T) -> bool {
        self.inner.remove(item)
    }

    #[inline]
    pub fn contains(&self, item: &T) -> bool {
        self.inner.contains(item)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}
