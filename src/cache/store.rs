//! Cache Store Module
//!
//! The typed response cache. Sits between data-access code and a remote
//! source: callers ask for a key, fetch on a miss, and write the result back
//! with a time-to-live.
//!
//! Reads never fail. A missing key, an expired entry, a corrupt record, a
//! storage error, and an unavailable medium all read as `None`. Writes report
//! every failure so callers know their data was not cached.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::entry::duration_to_ms;
use crate::cache::stats::StatsRecorder;
use crate::cache::{CacheEntry, CacheStats, Clock, RecordHeader, SystemClock};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::storage::{CacheStorage, SqliteStorage};

// == Backend ==
enum Backend {
    Ready(Arc<dyn CacheStorage>),
    /// The medium failed to open; holds the reason
    Unavailable(String),
}

struct Shared {
    backend: Backend,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
    stats: StatsRecorder,
}

/// Outcome of looking a key up, before it is collapsed into `Option<T>`.
enum Lookup<T> {
    Hit(T),
    Missing,
    /// Past its ttl; `evicted` is false if it is still in storage
    Expired { evicted: bool },
    Corrupt,
    Failed,
}

// == Response Cache ==
/// A key/value cache with per-entry expiration over a persistent medium.
///
/// Cloning is cheap and every clone, as well as every [`typed`](Self::typed)
/// view, shares one storage handle, clock, default TTL and statistics.
pub struct ResponseCache<T> {
    shared: Arc<Shared>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Clone for ResponseCache<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            _payload: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ResponseCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = match &self.shared.backend {
            Backend::Ready(_) => "ready",
            Backend::Unavailable(_) => "unavailable",
        };
        f.debug_struct("ResponseCache")
            .field("backend", &backend)
            .field("default_ttl", &self.shared.default_ttl)
            .field("clock", &self.shared.clock)
            .finish()
    }
}

impl<T> ResponseCache<T> {
    // == Constructors ==
    /// Creates a cache over `storage` using wall-clock time.
    ///
    /// # Arguments
    /// * `storage` - The opened storage medium
    /// * `default_ttl` - TTL applied when a caller omits one
    pub fn new(storage: Arc<dyn CacheStorage>, default_ttl: Duration) -> Self {
        Self::with_clock(storage, default_ttl, Arc::new(SystemClock))
    }

    /// Creates a cache over `storage` reading time from `clock`.
    pub fn with_clock(
        storage: Arc<dyn CacheStorage>,
        default_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::from_backend(Backend::Ready(storage), default_ttl, clock)
    }

    /// Creates a cache whose medium failed to open.
    ///
    /// Every read misses and every write fails with
    /// [`CacheError::StorageUnavailable`].
    pub fn unavailable(reason: impl Into<String>, default_ttl: Duration) -> Self {
        Self::from_backend(
            Backend::Unavailable(reason.into()),
            default_ttl,
            Arc::new(SystemClock),
        )
    }

    // == Open ==
    /// Opens the SQLite database named by `config`.
    ///
    /// An open failure is logged and yields an unavailable cache rather than
    /// an error, so callers can keep serving from the remote source.
    pub fn open(config: &Config) -> Self {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    /// Same as [`open`](Self::open) with an explicit clock.
    pub fn open_with_clock(config: &Config, clock: Arc<dyn Clock>) -> Self {
        match SqliteStorage::open(&config.db_path) {
            Ok(storage) => Self::with_clock(Arc::new(storage), config.default_ttl, clock),
            Err(e) => {
                warn!(
                    path = %config.db_path.display(),
                    error = %e,
                    "Response cache unavailable, all reads will miss"
                );
                Self::from_backend(Backend::Unavailable(e.to_string()), config.default_ttl, clock)
            }
        }
    }

    /// Opens the SQLite database named by `config`, failing if it cannot.
    pub fn try_open(config: &Config) -> Result<Self> {
        let storage = SqliteStorage::open(&config.db_path)?;
        Ok(Self::new(Arc::new(storage), config.default_ttl))
    }

    fn from_backend(backend: Backend, default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                default_ttl,
                clock,
                stats: StatsRecorder::default(),
            }),
            _payload: PhantomData,
        }
    }

    // == Typed View ==
    /// Returns a view of the same cache for another payload type.
    pub fn typed<U>(&self) -> ResponseCache<U> {
        ResponseCache {
            shared: Arc::clone(&self.shared),
            _payload: PhantomData,
        }
    }

    // == Accessors ==
    /// Returns true if the storage medium opened successfully.
    pub fn is_available(&self) -> bool {
        matches!(self.shared.backend, Backend::Ready(_))
    }

    /// Returns the TTL applied when a caller omits one.
    pub fn default_ttl(&self) -> Duration {
        self.shared.default_ttl
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.shared.stats.snapshot()
    }

    fn storage(&self) -> Result<&Arc<dyn CacheStorage>> {
        match &self.shared.backend {
            Backend::Ready(storage) => Ok(storage),
            Backend::Unavailable(reason) => Err(CacheError::StorageUnavailable(reason.clone())),
        }
    }

    fn now_ms(&self) -> i64 {
        self.shared.clock.now_ms()
    }

    // == Remove ==
    /// Removes the entry under `key`. Returns whether one existed.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        self.storage()?.delete(key).await
    }

    // == Clear ==
    /// Removes every entry, whatever its payload type.
    pub async fn clear(&self) -> Result<()> {
        self.storage()?.clear().await?;
        info!("Response cache cleared");
        Ok(())
    }

    // == Sweep Expired ==
    /// Removes every expired or unreadable record from storage.
    ///
    /// Only the record's timestamp and ttl are inspected, so one sweep covers
    /// all payload types sharing the medium. Returns the number removed.
    pub async fn sweep_expired(&self) -> Result<usize> {
        let storage = self.storage()?;
        let now = self.now_ms();
        let mut expired = 0usize;
        let mut corrupt = 0usize;

        for key in storage.keys().await? {
            let stale = match storage.get(&key).await {
                Ok(Some(raw)) => match serde_json::from_value::<RecordHeader>(raw) {
                    Ok(header) if header.is_valid_at(now) => continue,
                    Ok(_) => &mut expired,
                    Err(_) => &mut corrupt,
                },
                // Gone since the listing
                Ok(None) => continue,
                Err(CacheError::CorruptRecord(_)) => &mut corrupt,
                Err(e) => return Err(e),
            };

            if storage.delete(&key).await? {
                *stale += 1;
            }
        }

        self.shared.stats.record_evictions(expired as u64);
        if expired + corrupt > 0 {
            debug!(expired, corrupt, "Swept stale cache records");
        }
        Ok(expired + corrupt)
    }
}

impl<T> ResponseCache<T>
where
    T: Serialize + DeserializeOwned,
{
    // == Put ==
    /// Stores `value` under `key`, replacing any previous entry and resetting
    /// its timer.
    ///
    /// # Arguments
    /// * `key` - Non-empty cache key
    /// * `value` - The payload to store
    /// * `ttl` - Validity window (uses the default TTL if None)
    ///
    /// # Errors
    /// Returns an error if the key or ttl is invalid, the payload cannot be
    /// serialized, or the storage medium rejects the write.
    pub async fn put(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        let result = self.write(key, value, ttl).await;

        match &result {
            Ok(()) => self.shared.stats.record_write(),
            Err(e) => {
                self.shared.stats.record_write_failure();
                warn!(key, error = %e, "Failed to write cache entry");
            }
        }

        result
    }

    async fn write(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        validate_key(key)?;
        let ttl = self.effective_ttl(ttl)?;
        let storage = self.storage()?;

        let entry = CacheEntry::new(value, self.now_ms(), ttl);
        let record = serde_json::to_value(&entry)?;

        // Some payloads encode lossily (non-finite floats become null)
        serde_json::from_value::<CacheEntry<T>>(record.clone())?;

        storage.put(key, record).await
    }

    fn effective_ttl(&self, ttl: Option<Duration>) -> Result<Duration> {
        match ttl {
            Some(ttl) if duration_to_ms(ttl) == 0 => Err(CacheError::InvalidTtl(
                "ttl must be at least one millisecond".to_string(),
            )),
            Some(ttl) => Ok(ttl),
            None => Ok(self.shared.default_ttl),
        }
    }

    // == Get ==
    /// Returns the value under `key` if present and not expired.
    ///
    /// An expired entry is deleted from storage before the miss is reported.
    pub async fn get(&self, key: &str) -> Option<T> {
        let lookup = self.lookup(key, true).await;
        let stats = &self.shared.stats;

        match lookup {
            Lookup::Hit(value) => {
                stats.record_hit();
                return Some(value);
            }
            Lookup::Expired { evicted: true } => stats.record_evictions(1),
            Lookup::Corrupt => stats.record_corrupt(),
            Lookup::Expired { evicted: false } | Lookup::Missing | Lookup::Failed => {}
        }

        stats.record_miss();
        None
    }

    // == Peek ==
    /// Same as [`get`](Self::get) but never deletes and records no statistics.
    pub async fn peek(&self, key: &str) -> Option<T> {
        match self.lookup(key, false).await {
            Lookup::Hit(value) => Some(value),
            _ => None,
        }
    }

    async fn lookup(&self, key: &str, evict: bool) -> Lookup<T> {
        let Ok(storage) = self.storage() else {
            return Lookup::Failed;
        };

        let raw: Value = match storage.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Lookup::Missing,
            Err(e @ CacheError::CorruptRecord(_)) => {
                debug!(key, error = %e, "Unreadable cache record, treating as miss");
                return Lookup::Corrupt;
            }
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, treating as miss");
                return Lookup::Failed;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_value(raw) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key, error = %e, "Unreadable cache record, treating as miss");
                return Lookup::Corrupt;
            }
        };

        let now = self.now_ms();
        if entry.is_valid_at(now) {
            debug!(key, ttl_remaining_ms = entry.ttl_remaining_ms(now), "Cache hit");
            return Lookup::Hit(entry.data);
        }

        if !evict {
            return Lookup::Expired { evicted: false };
        }

        match storage.delete(key).await {
            Ok(evicted) => {
                debug!(key, "Evicted expired cache entry");
                Lookup::Expired { evicted }
            }
            Err(e) => {
                warn!(key, error = %e, "Failed to evict expired cache entry");
                Lookup::Expired { evicted: false }
            }
        }
    }

    // == Get Or Fetch ==
    /// Returns the cached value under `key`, or awaits `fetch` on a miss and
    /// caches its result.
    ///
    /// A failed write-back is logged and the fetched value is still returned.
    /// Fetch errors propagate and nothing is cached.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        fetch: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let value = fetch().await?;

        if let Err(e) = self.put(key, &value, ttl).await {
            debug!(key, error = %e, "Serving fetched value uncached");
        }

        Ok(value)
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key cannot be empty".to_string()));
    }
    Ok(())
}
