//! Expiry Module
//!
//! Timestamp bookkeeping shared by both cache variants. Expiry is evaluated only
//! when an entry is read or enumerated; nothing here runs on a timer.

use std::time::Duration;

// == Expiry ==
/// Time-to-live policy for a cache instance.
///
/// An entry is expired once its age is strictly greater than the TTL, so an
/// entry exactly `ttl` old is still served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Expiry {
    /// TTL in milliseconds, None = entries never expire
    ttl_ms: Option<u64>,
}

impl Expiry {
    // == Constructors ==
    /// Entries never expire.
    pub const fn never() -> Self {
        Self { ttl_ms: None }
    }

    /// Builds an expiry from a TTL in seconds; zero disables expiry.
    pub fn from_ttl_secs(ttl_secs: u64) -> Self {
        if ttl_secs == 0 {
            Self::never()
        } else {
            Self {
                ttl_ms: Some(ttl_secs.saturating_mul(1000)),
            }
        }
    }

    /// Builds an expiry from a [`Duration`]; a zero duration disables expiry.
    pub fn from_duration(ttl: Duration) -> Self {
        match ttl.as_millis() as u64 {
            0 => Self::never(),
            ms => Self { ttl_ms: Some(ms) },
        }
    }

    // == Is Expired ==
    /// Checks whether an entry stamped at `stamp` is stale at `now`.
    pub fn is_expired(&self, stamp: u64, now: u64) -> bool {
        match self.ttl_ms {
            Some(ttl) => now.saturating_sub(stamp) > ttl,
            None => false,
        }
    }

    /// Returns true when a TTL is configured.
    pub fn is_enabled(&self) -> bool {
        self.ttl_ms.is_some()
    }

    /// Returns the configured TTL, if any.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_ms.map(Duration::from_millis)
    }
}
