//! Generation-checked free-list arena.
//!
//! A [`Pool`] hands out [`Key`]s for the values it stores. Releasing a key
//! moves the value back out and bumps the slot's generation, so any copy of
//! the old key is rejected from then on. Vacated slots are reused LIFO, which
//! keeps the hot path allocation-free once the pool has warmed up.

use std::ops::{Index, IndexMut};

/// Opaque handle to a live pool slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Key {
    index: u32,
    generation: u32,
}

impl Key {
    /// Slot position inside the pool.
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
enum Entry<T> {
    Occupied(T),
    /// Next free slot, `u32::MAX` terminates the list.
    Vacant(u32),
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    entry: Entry<T>,
}

const FREE_NONE: u32 = u32::MAX;

/// Free-list backed storage with generation-checked keys.
#[derive(Debug)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free_head: u32,
    len: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: FREE_NONE,
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_head: FREE_NONE,
            len: 0,
        }
    }

    /// Number of live values.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slots ever allocated, live or free.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Stores `value`, reusing a released slot when one is available.
    pub fn acquire(&mut self, value: T) -> Key {
        self.len += 1;

        if self.free_head != FREE_NONE {
            let index = self.free_head;
            let slot = &mut self.slots[index as usize];
            let Entry::Vacant(next) = slot.entry else {
                unreachable!("free list points at an occupied slot");
            };
            self.free_head = next;
            slot.entry = Entry::Occupied(value);
            return Key {
                index,
                generation: slot.generation,
            };
        }

        let index = u32::try_from(self.slots.len()).expect("pool exceeds u32::MAX slots");
        assert!(index != FREE_NONE, "pool exceeds u32::MAX slots");
        self.slots.push(Slot {
            generation: 0,
            entry: Entry::Occupied(value),
        });
        Key {
            index,
            generation: 0,
        }
    }

    /// Moves the value out and returns the slot to the free list.
    ///
    /// Returns `None` for a stale key; the pool is left untouched.
    pub fn release(&mut self, key: Key) -> Option<T> {
        let slot = self.slots.get_mut(key.index())?;
        if slot.generation != key.generation || matches!(slot.entry, Entry::Vacant(_)) {
            return None;
        }

        let entry = std::mem::replace(&mut slot.entry, Entry::Vacant(self.free_head));
        slot.generation = slot.generation.wrapping_add(1);
        self.free_head = key.index;
        self.len -= 1;

        match entry {
            Entry::Occupied(value) => Some(value),
            Entry::Vacant(_) => unreachable!(),
        }
    }

    #[inline]
    pub fn contains(&self, key: Key) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: Key) -> Option<&T> {
        match self.slots.get(key.index()) {
            Some(Slot {
                generation,
                entry: Entry::Occupied(value),
            }) if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        match self.slots.get_mut(key.index()) {
            Some(Slot {
                generation,
                entry: Entry::Occupied(value),
            }) if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    /// Drops every live value. Outstanding keys all become stale.
    pub fn clear(&mut self) {
        self.free_head = FREE_NONE;
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            if matches!(slot.entry, Entry::Occupied(_)) {
                slot.generation = slot.generation.wrapping_add(1);
            }
            slot.entry = Entry::Vacant(self.free_head);
            self.free_head = index as u32;
        }
        self.len = 0;
    }
}

impl<T> Index<Key> for Pool<T> {
    type Output = T;

    fn index(&self, key: Key) -> &T {
        self.get(key).expect("stale pool key")
    }
}

impl<T> IndexMut<Key> for Pool<T> {
    fn index_mut(&mut self, key: Key) -> &mut T {
        self.get_mut(key).expect("stale pool key")
    }
}
