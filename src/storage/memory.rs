//! In-Memory Storage
//!
//! A process-local medium with an optional record quota. Nothing survives a
//! restart.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::CacheStorage;
use crate::error::{CacheError, Result};

// == Memory Storage ==
/// HashMap-backed storage guarded by an async RwLock.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    /// Records by key
    records: RwLock<HashMap<String, Value>>,
    /// Maximum number of distinct keys, None = unbounded
    quota: Option<usize>,
}

impl MemoryStorage {
    // == Constructor ==
    /// Creates an empty, unbounded storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty storage that refuses new keys once `max_records`
    /// are stored. Overwrites of existing keys are always accepted.
    pub fn with_quota(max_records: usize) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            quota: Some(max_records),
        }
    }

    // == Length ==
    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    // == Is Empty ==
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, record: Value) -> Result<()> {
        let mut records = self.records.write().await;

        if let Some(quota) = self.quota {
            if !records.contains_key(key) && records.len() >= quota {
                return Err(CacheError::QuotaExceeded(format!(
                    "storage holds its maximum of {} records",
                    quota
                )));
            }
        }

        records.insert(key.to_string(), record);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.records.write().await.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.records.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn clear(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_and_get() {
        let storage = MemoryStorage::new();

        storage.put("tools:all", json!({ "ttl": 1 })).await.unwrap();

        assert_eq!(
            storage.get("tools:all").await.unwrap(),
            Some(json!({ "ttl": 1 }))
        );
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let storage = MemoryStorage::new();
        assert!(storage.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let storage = MemoryStorage::new();

        storage.put("k", json!(1)).await.unwrap();
        storage.put("k", json!(2)).await.unwrap();

        assert_eq!(storage.get("k").await.unwrap(), Some(json!(2)));
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let storage = MemoryStorage::new();
        storage.put("k", json!(1)).await.unwrap();

        assert!(storage.delete("k").await.unwrap());
        assert!(!storage.delete("k").await.unwrap());
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_keys_sorted_and_clear() {
        let storage = MemoryStorage::new();
        storage.put("b", json!(1)).await.unwrap();
        storage.put("a", json!(2)).await.unwrap();

        assert_eq!(storage.keys().await.unwrap(), vec!["a", "b"]);

        storage.clear().await.unwrap();
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quota_rejects_new_keys() {
        let storage = MemoryStorage::with_quota(2);
        storage.put("a", json!(1)).await.unwrap();
        storage.put("b", json!(2)).await.unwrap();

        let result = storage.put("c", json!(3)).await;
        assert!(matches!(result, Err(CacheError::QuotaExceeded(_))));

        // Overwrites still fit
        storage.put("a", json!(10)).await.unwrap();
        assert_eq!(storage.get("a").await.unwrap(), Some(json!(10)));
        assert_eq!(storage.len().await, 2);
    }
}
