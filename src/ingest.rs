//! Ingest Module
//!
//! How the model layer writes decoded fetch results into shared caches.
//!
//! Every `async` function here awaits only the cache lock and then performs all
//! of its writes while holding it. A fetch that is cancelled before its
//! response is decoded never reaches these functions, and one cancelled while
//! waiting for the lock has written nothing.

use chrono::{DateTime, Utc};
use std::hash::Hash;
use tracing::debug;

use crate::cache::{Clock, KeyedCache, SortOrder, UnkeyedDedupCache};
use crate::config::CachePolicy;
use crate::error::Result;
use crate::registry::Shared;

// == Log Entry ==
/// A server log record (join, kill, command, mod call, ...).
pub trait LogEntry {
    /// When the logged event happened.
    fn created_at(&self) -> DateTime<Utc>;
}

/// Log cache ordered newest first.
pub type LogCache<E> = UnkeyedDedupCache<E>;

/// Sort order used by every log cache: newest entry at index 0.
pub fn newest_first<E: LogEntry + 'static>() -> SortOrder<E> {
    SortOrder::by_key(|entry: &E| entry.created_at(), true)
}

/// Creates an empty log cache with the given policy.
pub fn log_cache<E>(policy: CachePolicy) -> Result<LogCache<E>>
where
    E: LogEntry + PartialEq + Clone + 'static,
{
    UnkeyedDedupCache::new(policy, Some(newest_first()))
}

// == Record Entry ==
/// Adds `entry` unless a live entry with the same timestamp is already cached.
///
/// Returns true if the entry was added.
pub fn record_entry<E, C>(cache: &mut UnkeyedDedupCache<E, C>, entry: E) -> bool
where
    E: LogEntry + PartialEq + Clone,
    C: Clock,
{
    record_entry_by(cache, entry, |_| true)
}

/// Adds `entry` unless a live entry with the same timestamp is cached and
/// `same_event` accepts it.
///
/// Log streams where several events share one timestamp use `same_event` to
/// tell them apart, e.g. by comparing the player involved.
pub fn record_entry_by<E, C, F>(cache: &mut UnkeyedDedupCache<E, C>, entry: E, same_event: F) -> bool
where
    E: LogEntry + PartialEq + Clone,
    C: Clock,
    F: Fn(&E) -> bool,
{
    let created_at = entry.created_at();
    let seen = cache
        .items()
        .iter()
        .any(|cached| cached.created_at() == created_at && same_event(cached));
    if seen {
        return false;
    }
    cache.add(entry);
    true
}

// == Batch Writes ==
/// Records a decoded page of log entries and returns the cached stream.
pub async fn ingest_logs<E, C, I>(cache: &Shared<UnkeyedDedupCache<E, C>>, entries: I) -> Vec<E>
where
    E: LogEntry + PartialEq + Clone,
    C: Clock,
    I: IntoIterator<Item = E>,
{
    ingest_logs_by(cache, entries, |_, _| true).await
}

/// Like [`ingest_logs`], with `same_event(cached, incoming)` narrowing the
/// timestamp match.
pub async fn ingest_logs_by<E, C, I, F>(
    cache: &Shared<UnkeyedDedupCache<E, C>>,
    entries: I,
    same_event: F,
) -> Vec<E>
where
    E: LogEntry + PartialEq + Clone,
    C: Clock,
    I: IntoIterator<Item = E>,
    F: Fn(&E, &E) -> bool,
{
    let mut guard = cache.write().await;
    let mut added = 0usize;
    for entry in entries {
        let incoming = entry.clone();
        if record_entry_by(&mut *guard, entry, |cached| same_event(cached, &incoming)) {
            added += 1;
        }
    }
    debug!(added, "Ingested log entries");
    guard.items()
}

/// Adds every decoded value to an unkeyed cache, returning them in input order.
pub async fn add_all<V, C, I>(cache: &Shared<UnkeyedDedupCache<V, C>>, values: I) -> Vec<V>
where
    V: PartialEq + Clone,
    C: Clock,
    I: IntoIterator<Item = V>,
{
    let mut guard = cache.write().await;
    values.into_iter().map(|v| guard.add(v)).collect()
}

/// Stores every decoded `(key, value)` pair, returning the values in input
/// order.
pub async fn set_all<K, V, C, I>(cache: &Shared<KeyedCache<K, V, C>>, pairs: I) -> Vec<V>
where
    K: Eq + Hash + Clone,
    V: PartialEq + Clone,
    C: Clock,
    I: IntoIterator<Item = (K, V)>,
{
    let mut guard = cache.write().await;
    pairs.into_iter().map(|(k, v)| guard.set(k, v)).collect()
}
