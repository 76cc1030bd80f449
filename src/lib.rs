//! PRC Cache - entity caches for an async game-server API client
//!
//! Size-bounded caches with lazy TTL expiry that every entity repository
//! (servers, players, bans, vehicles and the log streams) is built on:
//! - [`KeyedCache`]: key → value with LRU eviction and optional value uniqueness
//! - [`UnkeyedDedupCache`]: deduplicating sequence with optional sort order
//!
//! Caches are shared between tasks through [`Shared`] handles held by
//! explicitly constructed registries ([`GlobalCaches`], [`ServerCaches`]).

pub mod cache;
pub mod config;
pub mod error;
pub mod ingest;
pub mod registry;

pub use cache::{CacheStats, EphemeralSlot, KeyedCache, SortOrder, UnkeyedDedupCache};
pub use config::{CachePolicy, GlobalCacheConfig, ServerCacheConfig};
pub use error::{CacheError, Result};
pub use ingest::LogEntry;
pub use registry::{shared, GlobalCaches, ServerCaches, ServerModels, Shared};
