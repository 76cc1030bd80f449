//! Unkeyed Cache Module
//!
//! Position-ordered cache without external keys. Values deduplicate by
//! equality and can be kept in a custom sort order.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

use tracing::debug;

use crate::cache::{CacheStats, Clock, Expiry, SystemClock};
use crate::config::CachePolicy;
use crate::error::Result;

type Comparator<V> = Box<dyn Fn(&V, &V) -> Ordering + Send + Sync>;

// == Sort Order ==
/// Ordering reapplied to the whole cache after every mutation.
pub struct SortOrder<V> {
    compare: Comparator<V>,
    descending: bool,
}

impl<V> SortOrder<V> {
    /// Sorts by the key extracted from each value.
    ///
    /// Equal keys keep their previous relative order in both directions.
    pub fn by_key<F, T>(key: F, descending: bool) -> Self
    where
        V: 'static,
        F: Fn(&V) -> T + Send + Sync + 'static,
        T: Ord + 'static,
    {
        Self {
            compare: Box::new(move |a, b| key(a).cmp(&key(b))),
            descending,
        }
    }

    fn apply<T>(&self, slots: &mut [T], value_of: impl Fn(&T) -> &V) {
        if self.descending {
            slots.sort_by(|a, b| (self.compare)(value_of(b), value_of(a)));
        } else {
            slots.sort_by(|a, b| (self.compare)(value_of(a), value_of(b)));
        }
    }
}

impl<V> fmt::Debug for SortOrder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortOrder")
            .field("descending", &self.descending)
            .finish_non_exhaustive()
    }
}

/// A stored value and the time it was added or last re-added.
#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    added_at: u64,
}

// == Unkeyed Dedup Cache ==
/// Size-bounded sequence of unique values.
///
/// Adding a value equal to one already present refreshes that entry instead of
/// growing the cache. When full, entries are evicted from the front of the
/// current sequence. With a [`SortOrder`] configured that front is whatever
/// sorted first, which is not necessarily the oldest insertion.
///
/// Positional reads do not refresh entries.
#[derive(Debug)]
pub struct UnkeyedDedupCache<V, C = SystemClock> {
    entries: VecDeque<Slot<V>>,
    stats: CacheStats,
    policy: CachePolicy,
    expiry: Expiry,
    sort: Option<SortOrder<V>>,
    clock: C,
}

impl<V> UnkeyedDedupCache<V, SystemClock>
where
    V: PartialEq + Clone,
{
    // == Constructor ==
    /// Creates a cache with the given policy using the wall clock.
    pub fn new(policy: CachePolicy, sort: Option<SortOrder<V>>) -> Result<Self> {
        Self::with_clock(policy, sort, SystemClock)
    }
}

impl<V, C> UnkeyedDedupCache<V, C>
where
    V: PartialEq + Clone,
    C: Clock,
{
    /// Creates a cache driven by a custom clock.
    pub fn with_clock(policy: CachePolicy, sort: Option<SortOrder<V>>, clock: C) -> Result<Self> {
        policy.validate()?;
        Ok(Self {
            entries: VecDeque::new(),
            stats: CacheStats::new(),
            expiry: Expiry::from_ttl_secs(policy.ttl),
            policy,
            sort,
            clock,
        })
    }

    // == Add ==
    /// Adds a value, or refreshes the timestamp of an equal one already present.
    ///
    /// Returns the value that was passed in.
    pub fn add(&mut self, value: V) -> V {
        let now = self.clock.now_ms();

        match self.entries.iter_mut().find(|slot| slot.value == value) {
            Some(existing) => existing.added_at = now,
            None => {
                while self.entries.len() >= self.policy.max_size {
                    if self.entries.pop_front().is_none() {
                        break;
                    }
                    self.stats.record_eviction();
                    debug!(max_size = self.policy.max_size, "Evicted entry from front");
                }
                self.entries.push_back(Slot {
                    value: value.clone(),
                    added_at: now,
                });
            }
        }

        self.resort();
        self.stats.set_total_entries(self.entries.len());
        value
    }

    // == Get ==
    /// Returns the value at `index`; negative indices count from the end.
    ///
    /// Out of range reads as absent. An expired entry is removed and reads as
    /// absent.
    pub fn get(&mut self, index: isize) -> Option<V> {
        let Some(pos) = self.resolve(index) else {
            self.stats.record_miss();
            return None;
        };

        let now = self.clock.now_ms();
        if self.expiry.is_expired(self.entries[pos].added_at, now) {
            self.entries.remove(pos);
            self.stats.record_expiration();
            self.stats.record_miss();
            self.stats.set_total_entries(self.entries.len());
            debug!(index, "Purged expired entry on read");
            return None;
        }

        self.stats.record_hit();
        Some(self.entries[pos].value.clone())
    }

    /// Shorthand for `get(0)`.
    pub fn first(&mut self) -> Option<V> {
        self.get(0)
    }

    // == Remove ==
    /// Removes the entry at `index`. Out of range is a no-op.
    pub fn remove(&mut self, index: isize) {
        if let Some(pos) = self.resolve(index) {
            self.entries.remove(pos);
            self.stats.set_total_entries(self.entries.len());
        }
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats.set_total_entries(0);
    }

    // == Items ==
    /// Purges expired entries and returns the remaining values in order.
    pub fn items(&mut self) -> Vec<V> {
        self.purge_expired();
        self.entries.iter().map(|slot| slot.value.clone()).collect()
    }

    // == Purge Expired ==
    /// Removes every stale entry, keeping the order of the rest. Returns how
    /// many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        if !self.expiry.is_enabled() {
            return 0;
        }

        let now = self.clock.now_ms();
        let before = self.entries.len();
        let expiry = self.expiry;
        self.entries
            .retain(|slot| !expiry.is_expired(slot.added_at, now));

        let count = before - self.entries.len();
        if count > 0 {
            self.stats.expirations += count as u64;
            self.stats.set_total_entries(self.entries.len());
            debug!(count, "Purged expired entries");
        }
        count
    }

    // == Contains ==
    /// Checks for an equal, live value. Does not purge.
    pub fn contains(&self, value: &V) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .iter()
            .find(|slot| slot.value == *value)
            .is_some_and(|slot| !self.expiry.is_expired(slot.added_at, now))
    }

    // == Length ==
    /// Returns the number of stored entries, including any not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn is_sorted(&self) -> bool {
        self.sort.is_some()
    }

    fn resolve(&self, index: isize) -> Option<usize> {
        let len = self.entries.len() as isize;
        let pos = if index < 0 { len + index } else { index };
        (0..len).contains(&pos).then_some(pos as usize)
    }

    fn resort(&mut self) {
        if let Some(sort) = &self.sort {
            sort.apply(self.entries.make_contiguous(), |slot| &slot.value);
        }
    }
}
