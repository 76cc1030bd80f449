//! Cache Registry Module
//!
//! Explicitly constructed sets of shared cache instances: one [`GlobalCaches`]
//! per client and one [`ServerCaches`] per server handle. Cloning a registry
//! clones handles, not caches, so every clone sees the same data. The caches
//! are dropped with the last handle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::info;

use crate::cache::{EphemeralSlot, KeyedCache, UnkeyedDedupCache};
use crate::config::{GlobalCacheConfig, ServerCacheConfig};
use crate::error::Result;
use crate::ingest::{log_cache, LogCache, LogEntry};

/// A cache instance shared between tasks.
///
/// Cache methods never await, so each call made under the guard is atomic with
/// respect to every other task.
pub type Shared<T> = Arc<RwLock<T>>;

/// Wraps a cache for sharing.
pub fn shared<T>(cache: T) -> Shared<T> {
    Arc::new(RwLock::new(cache))
}

// == Global Caches ==
/// Caches shared by every server handle of one client.
///
/// `S` is the server handle type, `P` the player type.
pub struct GlobalCaches<S, P> {
    /// Server handles keyed by server id
    pub servers: Shared<KeyedCache<String, S>>,
    /// Players keyed by user id
    pub players: Shared<KeyedCache<u64, P>>,
}

impl<S, P> Clone for GlobalCaches<S, P> {
    fn clone(&self) -> Self {
        Self {
            servers: Arc::clone(&self.servers),
            players: Arc::clone(&self.players),
        }
    }
}

impl<S, P> GlobalCaches<S, P>
where
    S: PartialEq + Clone,
    P: PartialEq + Clone,
{
    /// Builds every cache from the given configuration.
    pub fn new(config: &GlobalCacheConfig) -> Result<Self> {
        let caches = Self {
            servers: shared(KeyedCache::new(config.servers, true)?),
            players: shared(KeyedCache::new(config.players, true)?),
        };
        info!(
            "Global caches initialized: servers={}, players={}",
            config.servers.max_size, config.players.max_size
        );
        Ok(caches)
    }

    // == Server Handle ==
    /// Returns the cached handle for `server_id`, creating and caching one with
    /// `make` if none is live.
    ///
    /// Lookup and insertion happen under one lock, so concurrent callers for
    /// the same id all receive the same handle.
    pub async fn server_or_insert_with<F>(&self, server_id: &str, make: F) -> S
    where
        F: FnOnce() -> S,
    {
        let mut servers = self.servers.write().await;
        let key = server_id.to_string();
        match servers.get(&key) {
            Some(server) => server,
            None => servers.set(key, make()),
        }
    }

    /// Re-stores `server` under `server_id` after a fetch, marking it most
    /// recently used so active servers are the last to be evicted.
    pub async fn refresh_server(&self, server_id: &str, server: S) -> S {
        self.servers.write().await.set(server_id.to_string(), server)
    }

    /// Scans cached players for the first match.
    pub async fn find_player<F>(&self, matches: F) -> Option<P>
    where
        F: Fn(&P) -> bool,
    {
        let mut players = self.players.write().await;
        players.values().into_iter().find(|p| matches(p))
    }
}

// == Server Models ==
/// Entity types stored by a server handle's caches.
pub trait ServerModels {
    type Player: PartialEq + Clone;
    type Ban: PartialEq + Clone;
    type Vehicle: PartialEq + Clone;
    type JoinEntry: LogEntry + PartialEq + Clone + 'static;
    type KillEntry: LogEntry + PartialEq + Clone + 'static;
    type CommandEntry: LogEntry + PartialEq + Clone + 'static;
    type ModCallEntry: LogEntry + PartialEq + Clone + 'static;
}

// == Server Caches ==
/// Long-lived caches owned by one server handle.
pub struct ServerCaches<M: ServerModels> {
    /// Online players keyed by user id
    pub players: Shared<KeyedCache<u64, M::Player>>,
    /// Banned players keyed by user id
    pub bans: Shared<KeyedCache<u64, M::Ban>>,
    pub vehicles: Shared<UnkeyedDedupCache<M::Vehicle>>,
    pub join_logs: Shared<LogCache<M::JoinEntry>>,
    pub kill_logs: Shared<LogCache<M::KillEntry>>,
    pub command_logs: Shared<LogCache<M::CommandEntry>>,
    pub mod_call_logs: Shared<LogCache<M::ModCallEntry>>,
    ephemeral_ttl: Duration,
}

impl<M: ServerModels> Clone for ServerCaches<M> {
    fn clone(&self) -> Self {
        Self {
            players: Arc::clone(&self.players),
            bans: Arc::clone(&self.bans),
            vehicles: Arc::clone(&self.vehicles),
            join_logs: Arc::clone(&self.join_logs),
            kill_logs: Arc::clone(&self.kill_logs),
            command_logs: Arc::clone(&self.command_logs),
            mod_call_logs: Arc::clone(&self.mod_call_logs),
            ephemeral_ttl: self.ephemeral_ttl,
        }
    }
}

impl<M: ServerModels> ServerCaches<M> {
    /// Builds every cache from the given configuration.
    ///
    /// Log caches keep the newest entry first.
    pub fn new(config: &ServerCacheConfig) -> Result<Self> {
        config.validate()?;
        let caches = Self {
            players: shared(KeyedCache::new(config.players, true)?),
            bans: shared(KeyedCache::new(config.bans, true)?),
            vehicles: shared(UnkeyedDedupCache::new(config.vehicles, None)?),
            join_logs: shared(log_cache(config.join_logs)?),
            kill_logs: shared(log_cache(config.kill_logs)?),
            command_logs: shared(log_cache(config.command_logs)?),
            mod_call_logs: shared(log_cache(config.mod_call_logs)?),
            ephemeral_ttl: Duration::from_secs(config.ephemeral_ttl),
        };
        info!(
            "Server caches initialized: players={}, bans={}, vehicles={}, ephemeral_ttl={}s",
            config.players.max_size,
            config.bans.max_size,
            config.vehicles.max_size,
            config.ephemeral_ttl
        );
        Ok(caches)
    }

    /// Creates a result memo for one fetch operation of this server.
    pub fn ephemeral<T: Clone>(&self) -> EphemeralSlot<T> {
        EphemeralSlot::new(self.ephemeral_ttl)
    }

    /// Scans cached online players for the first match.
    pub async fn find_player<F>(&self, matches: F) -> Option<M::Player>
    where
        F: Fn(&M::Player) -> bool,
    {
        let mut players = self.players.write().await;
        players.values().into_iter().find(|p| matches(p))
    }

    /// Empties every cache of this server.
    pub async fn clear_all(&self) {
        self.players.write().await.clear();
        self.bans.write().await.clear();
        self.vehicles.write().await.clear();
        self.join_logs.write().await.clear();
        self.kill_logs.write().await.clear();
        self.command_logs.write().await.clear();
        self.mod_call_logs.write().await.clear();
    }
}
