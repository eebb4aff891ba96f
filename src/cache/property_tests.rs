//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check read-after-write, expiry, the inclusive boundary,
//! and last-write-wins against a simple model.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{ManualClock, ResponseCache};
use crate::storage::{CacheStorage, MemoryStorage};

// == Test Configuration ==
const T0: i64 = 1_700_000_000_000;
const TEST_DEFAULT_TTL: Duration = Duration::from_secs(3600);

fn setup() -> (ResponseCache<String>, Arc<MemoryStorage>, Arc<ManualClock>) {
    let storage = Arc::new(MemoryStorage::new());
    let clock = Arc::new(ManualClock::new(T0));
    let cache = ResponseCache::with_clock(storage.clone(), TEST_DEFAULT_TTL, clock.clone());
    (cache, storage, clock)
}

// == Strategies ==
/// Generates cache keys shaped like `resource:id`
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,8}:[a-zA-Z0-9_]{1,16}"
}

fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,128}"
}

fn ttl_ms_strategy() -> impl Strategy<Value = u64> {
    1u64..10_000_000
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, value: String, ttl_ms: u64 },
    Get { key: String },
    Advance { ms: u64 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    // A small key space so puts and gets collide
    let key = prop::sample::select(vec!["tools:all", "tools:1", "user:42"]).prop_map(String::from);

    prop_oneof![
        (key.clone(), valid_value_strategy(), 1u64..500)
            .prop_map(|(key, value, ttl_ms)| CacheOp::Put { key, value, ttl_ms }),
        key.prop_map(|key| CacheOp::Get { key }),
        (0u64..300).prop_map(|ms| CacheOp::Advance { ms }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // A fresh write is immediately readable.
    #[test]
    fn prop_read_after_write(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        ttl_ms in ttl_ms_strategy()
    ) {
        let (cache, _, _) = setup();

        let read = tokio_test::block_on(async {
            cache.put(&key, &value, Some(Duration::from_millis(ttl_ms))).await.unwrap();
            cache.get(&key).await
        });

        prop_assert_eq!(read, Some(value));
    }

    // Valid at exactly ttl elapsed, gone one millisecond later, and the
    // expired record is deleted from storage by the read.
    #[test]
    fn prop_expiry_boundary_and_lazy_eviction(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        ttl_ms in ttl_ms_strategy()
    ) {
        let (cache, storage, clock) = setup();

        tokio_test::block_on(async {
            cache.put(&key, &value, Some(Duration::from_millis(ttl_ms))).await.unwrap();

            clock.advance(Duration::from_millis(ttl_ms));
            prop_assert_eq!(cache.get(&key).await, Some(value.clone()));

            clock.advance(Duration::from_millis(1));
            prop_assert_eq!(cache.get(&key).await, None);
            prop_assert!(storage.get(&key).await.unwrap().is_none());
            Ok(())
        })?;
    }

    // The second write wins and its own timestamp and ttl govern expiry.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy(),
        ttl1 in 1u64..1000,
        ttl2 in 1u64..1000,
        gap in 0u64..1000
    ) {
        let (cache, storage, clock) = setup();

        tokio_test::block_on(async {
            cache.put(&key, &value1, Some(Duration::from_millis(ttl1))).await.unwrap();
            clock.advance(Duration::from_millis(gap));
            cache.put(&key, &value2, Some(Duration::from_millis(ttl2))).await.unwrap();

            prop_assert_eq!(storage.len().await, 1);

            clock.advance(Duration::from_millis(ttl2));
            prop_assert_eq!(cache.get(&key).await, Some(value2.clone()));

            clock.advance(Duration::from_millis(1));
            prop_assert_eq!(cache.get(&key).await, None);
            Ok(())
        })?;
    }

    // Any interleaving of writes, reads, and time passing matches a model
    // where each key holds its last write until that write's ttl elapses.
    #[test]
    fn prop_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let (cache, _, clock) = setup();
        let mut model: HashMap<String, (String, i64, u64)> = HashMap::new();
        let mut now = T0;

        tokio_test::block_on(async {
            for op in ops {
                match op {
                    CacheOp::Put { key, value, ttl_ms } => {
                        cache.put(&key, &value, Some(Duration::from_millis(ttl_ms))).await.unwrap();
                        model.insert(key, (value, now, ttl_ms));
                    }
                    CacheOp::Get { key } => {
                        let expected = match model.get(&key) {
                            Some((value, at, ttl)) if now - at <= *ttl as i64 => Some(value.clone()),
                            _ => None,
                        };
                        if expected.is_none() {
                            model.remove(&key);
                        }
                        prop_assert_eq!(cache.get(&key).await, expected);
                    }
                    CacheOp::Advance { ms } => {
                        clock.advance(Duration::from_millis(ms));
                        now += ms as i64;
                    }
                }
            }
            Ok(())
        })?;

        let stats = cache.stats();
        prop_assert_eq!(stats.write_failures, 0);
    }
}

// == Additional Unit Tests for Edge Cases ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttl_window() {
        let (cache, _, clock) = setup();

        tokio_test::block_on(async {
            cache.put("tools:all", &"catalog".to_string(), None).await.unwrap();
            assert_eq!(cache.get("tools:all").await, Some("catalog".to_string()));

            clock.advance(TEST_DEFAULT_TTL);
            assert_eq!(cache.get("tools:all").await, Some("catalog".to_string()));

            clock.advance(Duration::from_millis(1));
            assert_eq!(cache.get("tools:all").await, None);
        });
    }
}
