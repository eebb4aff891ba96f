//! Error types for the response cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache and storage operations.
///
/// Only write-side operations surface these to callers. Reads collapse every
/// failure into a plain miss.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The storage medium could not be opened; caching is disabled
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A storage transaction failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored record could not be decoded by the medium
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// The storage medium refused a new record
    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The payload could not be encoded as a record
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rejected cache key
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Rejected time-to-live
    #[error("Invalid ttl: {0}")]
    InvalidTtl(String),
}

impl From<rusqlite::Error> for CacheError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref code, _)
                if code.code == rusqlite::ErrorCode::DiskFull =>
            {
                CacheError::QuotaExceeded(err.to_string())
            }
            other => CacheError::Storage(other.to_string()),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CacheError::InvalidKey("key cannot be empty".to_string());
        assert_eq!(err.to_string(), "Invalid key: key cannot be empty");

        let err = CacheError::StorageUnavailable("blocked".to_string());
        assert!(err.to_string().contains("blocked"));
    }

    #[test]
    fn test_serde_error_converts() {
        let parse_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: CacheError = parse_err.into();
        assert!(matches!(err, CacheError::Serialization(_)));
    }

    #[test]
    fn test_sqlite_error_converts_to_storage() {
        let err: CacheError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, CacheError::Storage(_)));
    }
}
