//! toolcache - cache maintenance process
//!
//! Opens the configured cache database, sweeps stale records, and reports
//! statistics. With a sweep interval configured it keeps sweeping until
//! shutdown.

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use toolcache::{spawn_sweep_task, Config, ResponseCache};

/// Main entry point for the cache maintenance process.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the cache database
/// 4. Sweep stale records once
/// 5. If a sweep interval is set, keep sweeping until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "toolcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: db_path={}, default_ttl={}ms, sweep_interval={:?}",
        config.db_path.display(),
        config.default_ttl.as_millis(),
        config.sweep_interval
    );

    // Payload type is irrelevant for maintenance
    let cache: ResponseCache<serde_json::Value> = ResponseCache::try_open(&config)
        .with_context(|| format!("failed to open cache at {}", config.db_path.display()))?;

    let removed = cache.sweep_expired().await.context("initial sweep failed")?;
    info!("Initial sweep removed {} stale records", removed);

    if let Some(interval) = config.sweep_interval {
        let sweep_handle = spawn_sweep_task(cache.clone(), interval);
        shutdown_signal().await;
        sweep_handle.abort();
        warn!("Sweep task aborted");
    }

    let stats = cache.stats();
    info!(
        "Cache stats: evictions={}, hits={}, misses={}",
        stats.evictions, stats.hits, stats.misses
    );

    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
