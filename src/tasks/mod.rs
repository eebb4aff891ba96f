//! Background Tasks Module
//!
//! Optional maintenance that runs alongside the cache.
//!
//! # Tasks
//! - Expiry sweep: eagerly removes stale records at a configured interval.
//!   Reads already evict lazily, so this only bounds how long dead records
//!   occupy storage.

mod sweep;

pub use sweep::spawn_sweep_task;
