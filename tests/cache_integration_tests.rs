//! Integration Tests for the Cache Layer
//!
//! Drives the public API the way the client's fetch paths do: shared registry
//! instances written from concurrent tasks, then read back.

use std::sync::{Arc, Once};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use prc_cache::cache::ManualClock;
use prc_cache::ingest::{ingest_logs, ingest_logs_by, set_all};
use prc_cache::{
    shared, CachePolicy, GlobalCacheConfig, GlobalCaches, KeyedCache, LogEntry, ServerCacheConfig,
    ServerCaches, ServerModels, SortOrder, UnkeyedDedupCache,
};

// == Helper Types ==

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "prc_cache=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone, PartialEq)]
struct Player {
    id: u64,
    name: String,
}

#[derive(Debug, Clone, PartialEq)]
struct KillEntry {
    timestamp: i64,
    killer: u64,
    killed: u64,
}

impl LogEntry for KillEntry {
    fn created_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.timestamp, 0).unwrap()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Vehicle {
    owner: u64,
    model: String,
}

struct Erlc;

impl ServerModels for Erlc {
    type Player = Player;
    type Ban = Player;
    type Vehicle = Vehicle;
    type JoinEntry = KillEntry;
    type KillEntry = KillEntry;
    type CommandEntry = KillEntry;
    type ModCallEntry = KillEntry;
}

fn kill(timestamp: i64, killer: u64, killed: u64) -> KillEntry {
    KillEntry {
        timestamp,
        killer,
        killed,
    }
}

// == Keyed Scenarios ==

#[test]
fn test_unique_value_reassigned_between_keys() -> anyhow::Result<()> {
    init_tracing();
    let mut cache = KeyedCache::new(CachePolicy::new(2, 0)?, true)?;

    cache.set("a", 1);
    cache.set("b", 1);

    assert_eq!(cache.get(&"a"), None);
    assert_eq!(cache.get(&"b"), Some(1));
    Ok(())
}

#[test]
fn test_recency_eviction() -> anyhow::Result<()> {
    let mut cache = KeyedCache::new(CachePolicy::new(2, 0)?, true)?;

    cache.set("A", 1);
    cache.set("B", 2);
    assert_eq!(cache.get(&"A"), Some(1));
    cache.set("C", 3);

    assert!(cache.contains(&"A"));
    assert!(!cache.contains(&"B"));
    assert_eq!(cache.items(), vec![("A", 1), ("C", 3)]);
    Ok(())
}

#[tokio::test]
async fn test_keyed_ttl_with_wall_clock() -> anyhow::Result<()> {
    let mut cache = KeyedCache::new(CachePolicy::new(10, 1)?, true)?;

    cache.set(1u64, "value".to_string());
    assert!(cache.contains(&1));

    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert!(!cache.contains(&1));
    assert_eq!(cache.get(&1), None);
    assert!(cache.is_empty());
    Ok(())
}

#[test]
fn test_clear_is_idempotent() -> anyhow::Result<()> {
    let mut keyed = KeyedCache::new(CachePolicy::new(5, 0)?, false)?;
    let mut unkeyed = UnkeyedDedupCache::new(CachePolicy::new(5, 0)?, None)?;

    keyed.set("k", 1);
    unkeyed.add(1);

    for _ in 0..2 {
        keyed.clear();
        unkeyed.clear();
        assert_eq!(keyed.len(), 0);
        assert_eq!(unkeyed.len(), 0);
        assert_eq!(keyed.get(&"k"), None);
        assert!(!unkeyed.contains(&1));
    }
    Ok(())
}

#[test]
fn test_invalid_policy_rejected() {
    let policy = CachePolicy {
        max_size: 0,
        ttl: 30,
    };
    assert!(KeyedCache::<u64, u64>::new(policy, true).is_err());
    assert!(UnkeyedDedupCache::<u64>::new(policy, None).is_err());
}

// == Unkeyed Scenarios ==

#[test]
fn test_sort_reapplication() -> anyhow::Result<()> {
    let sort = SortOrder::by_key(|v: &Vehicle| v.owner, false);
    let mut cache = UnkeyedDedupCache::new(CachePolicy::new(10, 0)?, Some(sort))?;

    for owner in [5, 1, 3] {
        cache.add(Vehicle {
            owner,
            model: format!("model-{}", owner),
        });
    }

    let owners: Vec<u64> = cache.items().iter().map(|v| v.owner).collect();
    assert_eq!(owners, vec![1, 3, 5]);
    Ok(())
}

#[test]
fn test_unkeyed_ttl_excludes_stale_entries() -> anyhow::Result<()> {
    let clock = ManualClock::new();
    let mut cache =
        UnkeyedDedupCache::with_clock(CachePolicy::new(10, 60)?, None, clock.clone())?;

    cache.add("first");
    clock.advance(Duration::from_secs(61));
    cache.add("second");

    assert_eq!(cache.items(), vec!["second"]);
    assert_eq!(cache.get(1), None);
    Ok(())
}

// == Shared Registries ==

#[tokio::test]
async fn test_concurrent_log_ingestion_has_no_duplicates() -> anyhow::Result<()> {
    init_tracing();
    let caches = ServerCaches::<Erlc>::new(&ServerCacheConfig::default())?;

    // Several overlapping pages of the same kill feed fetched concurrently
    let mut handles = Vec::new();
    for page in 0..8i64 {
        let logs = caches.kill_logs.clone();
        handles.push(tokio::spawn(async move {
            let entries: Vec<KillEntry> = (page..page + 5).map(|t| kill(t, 1, 2)).collect();
            tokio::task::yield_now().await;
            ingest_logs(&logs, entries).await
        }));
    }
    for handle in handles {
        handle.await?;
    }

    let stream = caches.kill_logs.write().await.items();
    let stamps: Vec<i64> = stream.iter().map(|e| e.timestamp).collect();
    assert_eq!(stamps, (0..12).rev().collect::<Vec<_>>());
    Ok(())
}

#[tokio::test]
async fn test_same_second_events_distinguished_by_player() -> anyhow::Result<()> {
    let caches = ServerCaches::<Erlc>::new(&ServerCacheConfig::default())?;

    let page = vec![kill(100, 1, 2), kill(100, 3, 4), kill(100, 1, 2)];
    let stream = ingest_logs_by(&caches.join_logs, page, |cached, incoming| {
        cached.killer == incoming.killer
    })
    .await;

    assert_eq!(stream.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_log_cache_bounded() -> anyhow::Result<()> {
    let config = ServerCacheConfig {
        command_logs: CachePolicy::new(3, 0)?,
        ..ServerCacheConfig::default()
    };
    let caches = ServerCaches::<Erlc>::new(&config)?;

    let stream = ingest_logs(&caches.command_logs, (1..=5).map(|t| kill(t, 1, 1))).await;

    assert_eq!(stream.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_bans_set_from_fetch_are_visible_to_other_handles() -> anyhow::Result<()> {
    let caches = ServerCaches::<Erlc>::new(&ServerCacheConfig::default())?;
    let other = caches.clone();

    let bans = vec![
        (
            7,
            Player {
                id: 7,
                name: "griefer".to_string(),
            },
        ),
        (
            8,
            Player {
                id: 8,
                name: "spammer".to_string(),
            },
        ),
    ];
    set_all(&caches.bans, bans).await;

    let mut view = other.bans.write().await;
    assert_eq!(view.get(&7).map(|p| p.name), Some("griefer".to_string()));
    assert_eq!(view.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_server_resolution_yields_one_handle() -> anyhow::Result<()> {
    let global = GlobalCaches::<Arc<String>, Player>::new(&GlobalCacheConfig::default())?;

    let mut handles = Vec::new();
    for i in 0..10 {
        let global = global.clone();
        handles.push(tokio::spawn(async move {
            global
                .server_or_insert_with("server", || Arc::new(format!("handle-{}", i)))
                .await
        }));
    }

    let mut resolved = Vec::new();
    for handle in handles {
        resolved.push(handle.await?);
    }
    assert!(resolved.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    Ok(())
}

#[tokio::test]
async fn test_shared_wrapper_for_custom_cache() -> anyhow::Result<()> {
    let players = shared(KeyedCache::new(CachePolicy::new(100, 0)?, true)?);

    players.write().await.set(
        1u64,
        Player {
            id: 1,
            name: "alice".to_string(),
        },
    );

    let found = players
        .write()
        .await
        .values()
        .into_iter()
        .find(|p| p.name == "alice");
    assert_eq!(found.map(|p| p.id), Some(1));
    Ok(())
}
