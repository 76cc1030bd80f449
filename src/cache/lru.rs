//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for keyed cache eviction.

use std::collections::VecDeque;

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Keys are stored in a VecDeque where:
/// - Front = Most recently used
/// - Back = Least recently used
#[derive(Debug, Clone)]
pub struct LruTracker<K> {
    /// Order of keys by access time
    order: VecDeque<K>,
}

impl<K> Default for LruTracker<K> {
    fn default() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }
}

impl<K: PartialEq + Clone> LruTracker<K> {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as recently used (moves to front).
    ///
    /// If key exists, removes it first then adds to front.
    /// If key is new, just adds to front.
    pub fn touch(&mut self, key: &K) {
        self.remove(key);
        self.order.push_front(key.clone());
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<K> {
        self.order.pop_back()
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&K> {
        self.order.back()
    }

    // == Oldest First ==
    /// Iterates keys from least to most recently used.
    pub fn oldest_first(&self) -> impl Iterator<Item = &K> + '_ {
        self.order.iter().rev()
    }

    /// Forgets every key.
    pub fn clear(&mut self) {
        self.order.clear();
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &K) -> bool {
        self.order.iter().any(|k| k == key)
    }
}
