//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache records.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::ResponseCache;

/// Spawns a background task that calls [`ResponseCache::sweep_expired`]
/// every `interval`.
///
/// The sweep covers every payload type stored in the medium, so any typed
/// view of the cache will do. A failed sweep is logged and retried on the
/// next tick.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let cache: ResponseCache<serde_json::Value> = ResponseCache::open(&config);
/// let sweep_handle = spawn_sweep_task(cache.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task<T>(cache: ResponseCache<T>, interval: Duration) -> JoinHandle<()>
where
    T: 'static,
{
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs_f64(), "Starting cache sweep task");

        loop {
            tokio::time::sleep(interval).await;

            match cache.sweep_expired().await {
                Ok(0) => debug!("Cache sweep: no stale records found"),
                Ok(removed) => info!("Cache sweep: removed {} stale records", removed),
                Err(e) => warn!(error = %e, "Cache sweep failed"),
            }
        }
    })
}
