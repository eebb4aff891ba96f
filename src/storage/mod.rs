//! Storage Module
//!
//! The persistent medium behind the response cache. Records are opaque JSON
//! values keyed by the caller's string; the cache layer owns their shape.

mod memory;
mod sqlite;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use memory::MemoryStorage;
pub use sqlite::{SqliteStorage, COLLECTION_NAME, DATABASE_NAME, SCHEMA_VERSION};

/// Transactional key/value interface over a single named collection.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Loads the record stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Stores `record` under `key`, replacing any previous record.
    async fn put(&self, key: &str, record: Value) -> Result<()>;

    /// Removes the record under `key`. Returns whether one existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Lists every stored key.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Removes every record.
    async fn clear(&self) -> Result<()>;
}
