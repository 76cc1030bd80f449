//! Keyed Cache Module
//!
//! Key → value cache combining HashMap storage with LRU tracking, lazy TTL
//! expiry and optional cross-key value uniqueness.

use std::collections::HashMap;
use std::hash::Hash;

use tracing::{debug, trace};

use crate::cache::{CacheStats, Clock, Expiry, LruTracker, SystemClock};
use crate::config::CachePolicy;
use crate::error::Result;

/// A stored value and the time it was last set or read.
#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    touched_at: u64,
}

// == Keyed Cache ==
/// Size-bounded key → value cache with most-recently-used ordering.
///
/// With `unique` enabled (the default), no two keys ever hold equal values:
/// setting a value under one key drops it from every other key. Equality is the
/// value type's own [`PartialEq`].
///
/// Entries older than the TTL are never returned; they are purged when a read
/// or [`items`](Self::items) observes them, never by a background task.
#[derive(Debug)]
pub struct KeyedCache<K, V, C = SystemClock> {
    /// Key-value storage
    entries: HashMap<K, Slot<V>>,
    /// Recency order, back is the next eviction victim
    lru: LruTracker<K>,
    stats: CacheStats,
    policy: CachePolicy,
    expiry: Expiry,
    unique: bool,
    clock: C,
}

impl<K, V> KeyedCache<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
    V: PartialEq + Clone,
{
    // == Constructor ==
    /// Creates a cache with the given policy using the wall clock.
    ///
    /// # Arguments
    /// * `policy` - Maximum size and TTL (seconds, 0 = never expires)
    /// * `unique` - Whether equal values may live under more than one key
    pub fn new(policy: CachePolicy, unique: bool) -> Result<Self> {
        Self::with_clock(policy, unique, SystemClock)
    }
}

impl<K, V, C> KeyedCache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: PartialEq + Clone,
    C: Clock,
{
    /// Creates a cache driven by a custom clock.
    pub fn with_clock(policy: CachePolicy, unique: bool, clock: C) -> Result<Self> {
        policy.validate()?;
        Ok(Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            expiry: Expiry::from_ttl_secs(policy.ttl),
            policy,
            unique,
            clock,
        })
    }

    // == Set ==
    /// Stores `value` under `key` and marks it most recently used.
    ///
    /// Evicts least recently used entries until the cache fits `max_size`.
    /// Returns the stored value.
    pub fn set(&mut self, key: K, value: V) -> V {
        let now = self.clock.now_ms();

        if self.unique {
            let duplicates: Vec<K> = self
                .entries
                .iter()
                .filter(|(k, slot)| **k != key && slot.value == value)
                .map(|(k, _)| k.clone())
                .collect();
            if !duplicates.is_empty() {
                debug!(count = duplicates.len(), "Reassigning value from other keys");
            }
            for k in duplicates {
                self.remove_entry(&k);
            }
        }

        self.entries.insert(
            key.clone(),
            Slot {
                value: value.clone(),
                touched_at: now,
            },
        );
        self.lru.touch(&key);

        while self.entries.len() > self.policy.max_size {
            match self.lru.evict_oldest() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                    self.stats.record_eviction();
                    debug!(max_size = self.policy.max_size, "Evicted least recently used entry");
                }
                None => break,
            }
        }

        self.stats.set_total_entries(self.entries.len());
        value
    }

    // == Get ==
    /// Retrieves a value, refreshing its timestamp and recency.
    ///
    /// An expired entry is removed and reported as absent.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let now = self.clock.now_ms();

        let expired = match self.entries.get(key) {
            Some(slot) => self.expiry.is_expired(slot.touched_at, now),
            None => {
                self.stats.record_miss();
                trace!("Keyed cache miss");
                return None;
            }
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expiration();
            self.stats.record_miss();
            debug!("Purged expired entry on read");
            return None;
        }

        self.lru.touch(key);
        self.stats.record_hit();
        self.entries.get_mut(key).map(|slot| {
            slot.touched_at = now;
            slot.value.clone()
        })
    }

    // == Peek ==
    /// Returns a live value without touching recency, timestamps or stats.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .filter(|slot| !self.expiry.is_expired(slot.touched_at, now))
            .map(|slot| &slot.value)
    }

    // == Contains ==
    /// Checks for a live entry. Expired entries read as absent but are left
    /// in place for the next `get` or `items` to purge.
    pub fn contains(&self, key: &K) -> bool {
        self.peek(key).is_some()
    }

    // == Delete ==
    /// Removes an entry by key. Missing keys are ignored.
    pub fn delete(&mut self, key: &K) {
        self.remove_entry(key);
    }

    // == Clear ==
    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.stats.set_total_entries(0);
    }

    // == Items ==
    /// Purges expired entries and returns a snapshot of the rest, least
    /// recently used first.
    pub fn items(&mut self) -> Vec<(K, V)> {
        self.purge_expired();
        self.lru
            .oldest_first()
            .filter_map(|k| {
                self.entries
                    .get(k)
                    .map(|slot| (k.clone(), slot.value.clone()))
            })
            .collect()
    }

    /// Purges expired entries and returns the remaining values, least
    /// recently used first.
    pub fn values(&mut self) -> Vec<V> {
        self.items().into_iter().map(|(_, v)| v).collect()
    }

    // == Purge Expired ==
    /// Removes every stale entry and returns how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        if !self.expiry.is_enabled() {
            return 0;
        }

        let now = self.clock.now_ms();
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, slot)| self.expiry.is_expired(slot.touched_at, now))
            .map(|(k, _)| k.clone())
            .collect();

        let count = expired.len();
        for k in expired {
            self.remove_entry(&k);
            self.stats.record_expiration();
        }
        if count > 0 {
            debug!(count, "Purged expired entries");
        }
        count
    }

    // == Length ==
    /// Returns the number of stored entries, including any not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    fn remove_entry(&mut self, key: &K) {
        if self.entries.remove(key).is_some() {
            self.lru.remove(key);
            self.stats.set_total_entries(self.entries.len());
        }
    }
}
