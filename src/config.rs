//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::DEFAULT_TTL;
use crate::storage::DATABASE_NAME;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the SQLite database file backing the cache
    pub db_path: PathBuf,
    /// TTL applied when a caller omits one
    pub default_ttl: Duration,
    /// Interval between eager sweeps, None = lazy eviction only
    pub sweep_interval: Option<Duration>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `TOOLCACHE_DB_PATH` - Database file (default: toolcache.db)
    /// - `TOOLCACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 3600000)
    /// - `TOOLCACHE_SWEEP_INTERVAL` - Sweep frequency in seconds, 0 disables (default: 0)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            db_path: env::var("TOOLCACHE_DB_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            default_ttl: env::var("TOOLCACHE_DEFAULT_TTL_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.default_ttl),
            sweep_interval: env::var("TOOLCACHE_SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| (secs > 0).then(|| Duration::from_secs(secs)))
                .unwrap_or(defaults.sweep_interval),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(format!("{}.db", DATABASE_NAME)),
            default_ttl: DEFAULT_TTL,
            sweep_interval: None,
        }
    }
}
