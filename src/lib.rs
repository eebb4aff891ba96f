//! toolcache - A persistent response cache
//!
//! Memoizes remote reads for a validity window. Entries carry a per-entry TTL,
//! expire lazily on read, and live in SQLite so they survive a restart.

pub mod cache;
pub mod config;
pub mod error;
pub mod storage;
pub mod tasks;

pub use cache::{CacheStats, ResponseCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_sweep_task;
