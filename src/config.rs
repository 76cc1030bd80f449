//! Configuration Module
//!
//! Cache policies and the default sizes/TTLs for every cache a client and a
//! server handle own. Values can be overridden from environment variables or a
//! JSON document.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Default maximum number of entries for a cache without explicit sizing.
pub const DEFAULT_MAX_SIZE: usize = 100;

/// Default lifetime of memoized fetch results, in seconds.
pub const DEFAULT_EPHEMERAL_TTL: u64 = 5;

/// Environment variable prefix for all cache settings.
pub const ENV_PREFIX: &str = "PRC_CACHE";

const HOUR: u64 = 60 * 60;

// == Cache Policy ==
/// Size bound and TTL for one cache instance.
///
/// `ttl` is in seconds; zero means entries never expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// Maximum number of entries the cache can hold
    pub max_size: usize,
    /// Time-to-live in seconds, 0 = never expires
    #[serde(default)]
    pub ttl: u64,
}

impl CachePolicy {
    /// Creates a validated policy.
    pub fn new(max_size: usize, ttl: u64) -> Result<Self> {
        let policy = Self { max_size, ttl };
        policy.validate()?;
        Ok(policy)
    }

    /// Rejects policies that could never hold an entry.
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(CacheError::invalid_config("max_size must be positive"));
        }
        Ok(())
    }

    // == From Vars ==
    /// Reads `<PREFIX>_<NAME>_MAX_SIZE` and `<PREFIX>_<NAME>_TTL` through
    /// `lookup`, keeping `self` for anything unset.
    fn override_from<F>(self, name: &str, lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_size = parse_var(lookup, &format!("{}_{}_MAX_SIZE", ENV_PREFIX, name))?
            .unwrap_or(self.max_size);
        let ttl = parse_var(lookup, &format!("{}_{}_TTL", ENV_PREFIX, name))?.unwrap_or(self.ttl);
        Self::new(max_size, ttl)
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            ttl: 0,
        }
    }
}

const fn policy(max_size: usize, ttl: u64) -> CachePolicy {
    CachePolicy { max_size, ttl }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            CacheError::invalid_config(format!("{} is not a valid number: {:?}", name, raw))
        }),
    }
}

fn env_lookup(name: &str) -> Option<String> {
    env::var(name).ok()
}

// == Global Cache Config ==
/// Sizing for the caches shared across every server handle of one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalCacheConfig {
    /// Server handles keyed by server id
    pub servers: CachePolicy,
    /// Players keyed by user id
    pub players: CachePolicy,
}

impl Default for GlobalCacheConfig {
    fn default() -> Self {
        Self {
            servers: policy(2, 0),
            players: policy(100, 0),
        }
    }
}

impl GlobalCacheConfig {
    /// Loads the configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `PRC_CACHE_SERVERS_MAX_SIZE` / `PRC_CACHE_SERVERS_TTL` (default: 2 / 0)
    /// - `PRC_CACHE_PLAYERS_MAX_SIZE` / `PRC_CACHE_PLAYERS_TTL` (default: 100 / 0)
    pub fn from_env() -> Result<Self> {
        Self::from_vars(env_lookup)
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            servers: defaults.servers.override_from("SERVERS", &lookup)?,
            players: defaults.players.override_from("PLAYERS", &lookup)?,
        })
    }

    /// Rejects any invalid policy.
    pub fn validate(&self) -> Result<()> {
        self.servers.validate()?;
        self.players.validate()
    }
}

// == Server Cache Config ==
/// Sizing for the caches owned by a single server handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerCacheConfig {
    pub players: CachePolicy,
    pub bans: CachePolicy,
    pub vehicles: CachePolicy,
    pub join_logs: CachePolicy,
    pub kill_logs: CachePolicy,
    pub command_logs: CachePolicy,
    pub mod_call_logs: CachePolicy,
    /// How long a fetch result is reused before re-requesting, in seconds
    pub ephemeral_ttl: u64,
}

impl Default for ServerCacheConfig {
    fn default() -> Self {
        Self {
            players: policy(50, 0),
            bans: policy(500, 0),
            vehicles: policy(50, HOUR),
            join_logs: policy(100, 12 * HOUR),
            kill_logs: policy(100, 12 * HOUR),
            command_logs: policy(100, 12 * HOUR),
            mod_call_logs: policy(100, 12 * HOUR),
            ephemeral_ttl: DEFAULT_EPHEMERAL_TTL,
        }
    }
}

impl ServerCacheConfig {
    /// Loads the configuration from environment variables.
    ///
    /// Each cache reads `PRC_CACHE_<NAME>_MAX_SIZE` and `PRC_CACHE_<NAME>_TTL`
    /// where `<NAME>` is one of `SERVER_PLAYERS`, `BANS`, `VEHICLES`,
    /// `JOIN_LOGS`, `KILL_LOGS`, `COMMAND_LOGS` or `MOD_CALL_LOGS`.
    /// `PRC_CACHE_EPHEMERAL_TTL` sets the fetch memo lifetime.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(env_lookup)
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        Ok(Self {
            players: d.players.override_from("SERVER_PLAYERS", &lookup)?,
            bans: d.bans.override_from("BANS", &lookup)?,
            vehicles: d.vehicles.override_from("VEHICLES", &lookup)?,
            join_logs: d.join_logs.override_from("JOIN_LOGS", &lookup)?,
            kill_logs: d.kill_logs.override_from("KILL_LOGS", &lookup)?,
            command_logs: d.command_logs.override_from("COMMAND_LOGS", &lookup)?,
            mod_call_logs: d.mod_call_logs.override_from("MOD_CALL_LOGS", &lookup)?,
            ephemeral_ttl: parse_var(&lookup, &format!("{}_EPHEMERAL_TTL", ENV_PREFIX))?
                .unwrap_or(d.ephemeral_ttl),
        })
    }

    /// Parses a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CacheError::invalid_config(format!("malformed JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects any invalid policy.
    pub fn validate(&self) -> Result<()> {
        for policy in [
            &self.players,
            &self.bans,
            &self.vehicles,
            &self.join_logs,
            &self.kill_logs,
            &self.command_logs,
            &self.mod_call_logs,
        ] {
            policy.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio_test::{assert_err, assert_ok};

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_policy_rejects_zero_size() {
        assert_err!(CachePolicy::new(0, 10));
        let policy = assert_ok!(CachePolicy::new(1, 0));
        assert_eq!(policy.ttl, 0);
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerCacheConfig::default();
        assert_eq!(config.players, policy(50, 0));
        assert_eq!(config.bans, policy(500, 0));
        assert_eq!(config.vehicles.ttl, 3600);
        assert_eq!(config.join_logs, policy(100, 43_200));
        assert_eq!(config.ephemeral_ttl, 5);
    }

    #[test]
    fn test_global_config_default() {
        let config = GlobalCacheConfig::default();
        assert_eq!(config.servers, policy(2, 0));
        assert_eq!(config.players, policy(100, 0));
    }

    #[test]
    fn test_from_vars_overrides() {
        let config = ServerCacheConfig::from_vars(vars(&[
            ("PRC_CACHE_VEHICLES_MAX_SIZE", "10"),
            ("PRC_CACHE_KILL_LOGS_TTL", "0"),
            ("PRC_CACHE_EPHEMERAL_TTL", " 2 "),
        ]))
        .unwrap();

        assert_eq!(config.vehicles, policy(10, 3600));
        assert_eq!(config.kill_logs, policy(100, 0));
        assert_eq!(config.ephemeral_ttl, 2);
        assert_eq!(config.bans, policy(500, 0));
    }

    #[test]
    fn test_from_vars_rejects_garbage() {
        let result = GlobalCacheConfig::from_vars(vars(&[("PRC_CACHE_PLAYERS_TTL", "soon")]));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));

        let result = GlobalCacheConfig::from_vars(vars(&[("PRC_CACHE_SERVERS_MAX_SIZE", "0")]));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_global_config_from_env_defaults() {
        env::remove_var("PRC_CACHE_SERVERS_MAX_SIZE");
        env::remove_var("PRC_CACHE_SERVERS_TTL");
        env::remove_var("PRC_CACHE_PLAYERS_MAX_SIZE");
        env::remove_var("PRC_CACHE_PLAYERS_TTL");

        let config = GlobalCacheConfig::from_env().unwrap();
        assert_eq!(config, GlobalCacheConfig::default());
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            ServerCacheConfig::from_json(r#"{"bans": {"max_size": 20}, "ephemeral_ttl": 0}"#)
                .unwrap();

        assert_eq!(config.bans, policy(20, 0));
        assert_eq!(config.ephemeral_ttl, 0);
        assert_eq!(config.players, policy(50, 0));
    }

    #[test]
    fn test_from_json_invalid() {
        assert_err!(ServerCacheConfig::from_json("{"));
        assert_err!(ServerCacheConfig::from_json(r#"{"players": {"max_size": 0}}"#));
    }
}
