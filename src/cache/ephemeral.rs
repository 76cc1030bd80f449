//! Ephemeral Result Module
//!
//! Single-value memo for fetch results, so repeated calls within a few seconds
//! reuse the last response instead of hitting the API again.

use std::time::Duration;

use crate::cache::{Clock, Expiry, SystemClock};

// == Ephemeral Slot ==
/// Holds the last result of one fetch operation for a short TTL.
///
/// A value is reused while its age is below the TTL. A zero TTL disables
/// memoization: [`get`](Self::get) always misses.
#[derive(Debug)]
pub struct EphemeralSlot<T, C = SystemClock> {
    /// Memoized value and the time it was stored
    value: Option<(T, u64)>,
    expiry: Expiry,
    clock: C,
}

impl<T: Clone> EphemeralSlot<T, SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<T: Clone, C: Clock> EphemeralSlot<T, C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            value: None,
            expiry: Expiry::from_duration(ttl),
            clock,
        }
    }

    // == Get ==
    /// Returns the memoized value while it is still fresh.
    pub fn get(&mut self) -> Option<T> {
        if !self.expiry.is_enabled() {
            return None;
        }

        let now = self.clock.now_ms();
        let stale = match &self.value {
            Some((_, stored_at)) => self.is_stale(*stored_at, now),
            None => return None,
        };
        if stale {
            self.value = None;
            return None;
        }
        self.value.as_ref().map(|(value, _)| value.clone())
    }

    // == Store ==
    /// Replaces the memoized value and returns it.
    pub fn store(&mut self, value: T) -> T {
        if self.expiry.is_enabled() {
            self.value = Some((value.clone(), self.clock.now_ms()));
        }
        value
    }

    /// Forgets the memoized value.
    pub fn invalidate(&mut self) {
        self.value = None;
    }

    // A memo is reused only while younger than the TTL
    fn is_stale(&self, stored_at: u64, now: u64) -> bool {
        self.expiry
            .ttl()
            .is_some_and(|ttl| Duration::from_millis(now.saturating_sub(stored_at)) >= ttl)
    }
}
