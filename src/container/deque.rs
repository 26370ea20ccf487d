//! Doubly-linked deque over pooled nodes.
//!
//! Nodes live in a [`Pool`] and link to each other by [`Key`], giving O(1)
//! push and pop at both ends plus O(1) unlinking of any node whose key the
//! caller kept from the push.

use super::pool::{Key, Pool};

#[derive(Debug)]
struct Node<T> {
    item: T,
    prev: Option<Key>,
    next: Option<Key>,
}

#[derive(Debug)]
pub struct Deque<T> {
    nodes: Pool<Node<T>>,
    head: Option<Key>,
    tail: Option<Key>,
}

impl<T> Default for Deque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deque<T> {
    pub const fn new() -> Self {
        Self {
            nodes: Pool::new(),
            head: None,
            tail: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn push_back(&mut self, item: T) -> Key {
        let key = self.nodes.acquire(Node {
            item,
            prev: self.tail,
            next: None,
        });
        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(key),
            None => self.head = Some(key),
        }
        self.tail = Some(key);
        key
    }

    pub fn push_front(&mut self, item: T) -> Key {
        let key = self.nodes.acquire(Node {
            item,
            prev: None,
            next: self.head,
        });
        match self.head {
            Some(head) => self.nodes[head].prev = Some(key),
            None => self.tail = Some(key),
        }
        self.head = Some(key);
        key
    }

    pub fn pop_front(&mut self) -> Option<T> {
        let head = self.head?;
        self.remove(head)
    }

    pub fn pop_back(&mut self) -> Option<T> {
        let tail = self.tail?;
        self.remove(tail)
    }

    pub fn front(&self) -> Option<&T> {
        self.head.map(|key| &self.nodes[key].item)
    }

    pub fn back(&self) -> Option<&T> {
        self.tail.map(|key| &self.nodes[key].item)
    }

    /// Unlinks the node behind `key`. Stale keys return `None`.
    pub fn remove(&mut self, key: Key) -> Option<T> {
        let node = self.nodes.release(key)?;

        match node.prev {
            Some(prev) => self.nodes[prev].next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.nodes[next].prev = node.prev,
            None => self.tail = node.prev,
        }

        Some(node.item)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.head = None;
        self.tail = None;
    }

    /// Front-to-back iteration.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            deque: self,
            cursor: self.head,
        }
    }
}

pub struct Iter<'a, T> {
    deque: &'a Deque<T>,
    cursor: Option<Key>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let node = &self.deque.nodes[self.cursor?];
        self.cursor = node.next;
        Some(&node.item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(deque: &Deque<i32>) -> Vec<i32> {
        deque.iter().copied().collect()
    }

    #[test]
    fn fifo_through_back_and_front() {
        let mut deque = Deque::new();
        deque.push_back(1);
        deque.push_back(2);
        deque.push_back(3);

        assert_eq!(deque.len(), 3);
        assert_eq!(deque.pop_front(), Some(1));
        assert_eq!(deque.pop_front(), Some(2));
        assert_eq!(deque.pop_front(), Some(3));
        assert_eq!(deque.pop_front(), None);
        assert!(deque.is_empty());
    }

    #[test]
    fn both_ends() {
        let mut deque = Deque::new();
        deque.push_back(2);
        deque.push_front(1);
        deque.push_back(3);

        assert_eq!(collect(&deque), vec![1, 2, 3]);
        assert_eq!(deque.front(), Some(&1));
        assert_eq!(deque.back(), Some(&3));
        assert_eq!(deque.pop_back(), Some(3));
        assert_eq!(deque.pop_back(), Some(2));
        assert_eq!(deque.pop_back(), Some(1));
        assert_eq!(deque.back(), None);
    }

    #[test]
    fn remove_middle_relinks_neighbours() {
        let mut deque = Deque::new();
        deque.push_back(1);
        let middle = deque.push_back(2);
        deque.push_back(3);

        assert_eq!(deque.remove(middle), Some(2));
        assert_eq!(collect(&deque), vec![1, 3]);
        assert_eq!(deque.remove(middle), None);
    }

    #[test]
    fn remove_ends_updates_head_and_tail() {
        let mut deque = Deque::new();
        let first = deque.push_back(1);
        deque.push_back(2);
        let last = deque.push_back(3);

        deque.remove(first);
        deque.remove(last);
        assert_eq!(deque.front(), Some(&2));
        assert_eq!(deque.back(), Some(&2));
    }

    #[test]
    fn released_nodes_are_reused() {
        let mut deque = Deque::new();
        for i in 0..8 {
            deque.push_back(i);
        }
        while deque.pop_front().is_some() {}
        for i in 0..8 {
            deque.push_back(i);
        }
        assert_eq!(deque.nodes.capacity(), 8);
        assert_eq!(collect(&deque), (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn clear_resets_links() {
        let mut deque = Deque::new();
        let stale = deque.push_back(1);
        deque.push_back(2);
        deque.clear();

        assert!(deque.is_empty());
        assert_eq!(deque.len(), 0);
        assert_eq!(deque.remove(stale), None);
        deque.push_back(9);
        assert_eq!(collect(&deque), vec![9]);
    }
}
