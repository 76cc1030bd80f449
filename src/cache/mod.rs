//! Cache Module
//!
//! Size-bounded in-memory caches with lazy TTL expiry: a keyed cache with LRU
//! eviction and an unkeyed, deduplicating cache with optional sort order.

mod clock;
mod ephemeral;
mod expiry;
mod keyed;
mod lru;
mod stats;
mod unkeyed;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use ephemeral::EphemeralSlot;
pub use expiry::Expiry;
pub use keyed::KeyedCache;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use unkeyed::{SortOrder, UnkeyedDedupCache};
