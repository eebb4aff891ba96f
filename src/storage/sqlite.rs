//! SQLite Storage
//!
//! Durable medium for the response cache. One database file, one collection
//! table, opened once per process and shared by every cache view.
//!
//! ## Schema
//!
//! - `responses(key TEXT PRIMARY KEY, record TEXT NOT NULL)` holds each record
//!   as JSON text.
//! - `schema_version` records the layout version. A database written by a
//!   newer layout is refused rather than downgraded.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::{debug, info};

use super::CacheStorage;
use crate::error::{CacheError, Result};

/// Logical database name, also the stem of the default file name
pub const DATABASE_NAME: &str = "toolcache";

/// Table holding the cached records
pub const COLLECTION_NAME: &str = "responses";

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

// == SQLite Storage ==
/// Storage backed by a single SQLite connection.
///
/// rusqlite is blocking, so every operation runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    // == Open ==
    /// Opens (creating if needed) the database file at `path`.
    ///
    /// Every failure here is reported as [`CacheError::StorageUnavailable`].
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::StorageUnavailable(format!(
                    "failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            CacheError::StorageUnavailable(format!(
                "failed to open database {}: {}",
                path.display(),
                e
            ))
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| CacheError::StorageUnavailable(format!("failed to set pragmas: {}", e)))?;

        let storage = Self::initialize(conn)?;
        info!(path = %path.display(), "Opened cache database");
        Ok(storage)
    }

    /// Creates a private in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            CacheError::StorageUnavailable(format!("failed to create in-memory database: {}", e))
        })?;

        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS {collection} (
                key TEXT PRIMARY KEY,
                record TEXT NOT NULL
            );
            "#,
            collection = COLLECTION_NAME
        ))
        .map_err(|e| {
            CacheError::StorageUnavailable(format!("failed to initialize schema: {}", e))
        })?;

        let version = read_schema_version(&conn)
            .map_err(|e| CacheError::StorageUnavailable(format!("failed to read schema version: {}", e)))?;

        if version > SCHEMA_VERSION {
            return Err(CacheError::StorageUnavailable(format!(
                "database schema version {} is newer than supported version {}",
                version, SCHEMA_VERSION
            )));
        }

        if version < SCHEMA_VERSION {
            conn.execute(
                "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(|e| {
                CacheError::StorageUnavailable(format!("failed to record schema version: {}", e))
            })?;
            debug!(from = version, to = SCHEMA_VERSION, "Cache schema initialized");
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // == Schema Version ==
    /// Returns the schema version recorded in the database.
    pub async fn schema_version(&self) -> Result<i32> {
        self.run(|conn| read_schema_version(conn).map_err(CacheError::from))
            .await
    }

    /// Runs `op` against the connection on the blocking thread pool.
    async fn run<F, R>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| CacheError::Storage("connection lock poisoned".to_string()))?;
            op(&*guard)
        })
        .await
        .map_err(|e| CacheError::Storage(format!("storage task failed: {}", e)))?
    }
}

#[async_trait]
impl CacheStorage for SqliteStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let key = key.to_string();

        self.run(move |conn| {
            let text: Option<String> = conn
                .query_row(
                    &format!("SELECT record FROM {} WHERE key = ?1", COLLECTION_NAME),
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;

            text.map(|text| {
                serde_json::from_str(&text).map_err(|e| {
                    CacheError::CorruptRecord(format!("record under '{}' is not valid JSON: {}", key, e))
                })
            })
            .transpose()
        })
        .await
    }

    async fn put(&self, key: &str, record: Value) -> Result<()> {
        let key = key.to_string();
        let text = serde_json::to_string(&record)?;

        self.run(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {} (key, record) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET record = excluded.record",
                    COLLECTION_NAME
                ),
                params![key, text],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let key = key.to_string();

        self.run(move |conn| {
            let removed = conn.execute(
                &format!("DELETE FROM {} WHERE key = ?1", COLLECTION_NAME),
                params![key],
            )?;
            Ok(removed > 0)
        })
        .await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.run(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT key FROM {} ORDER BY key", COLLECTION_NAME))?;
            let keys = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(keys)
        })
        .await
    }

    async fn clear(&self) -> Result<()> {
        self.run(|conn| {
            conn.execute(&format!("DELETE FROM {}", COLLECTION_NAME), [])?;
            Ok(())
        })
        .await
    }
}

fn read_schema_version(conn: &Connection) -> rusqlite::Result<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
}
