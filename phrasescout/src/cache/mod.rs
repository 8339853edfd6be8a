use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::errors::{SearchError, SearchResult};
use crate::metrics::PoolMetrics;

/// Assigns stable, incrementing ids to values.
///
/// Values are keyed by their canonical JSON serialization, so two equal
/// values always receive the same id for the lifetime of the cache. Ids start
/// at 1. The cache is an ordinary owned object; callers decide how long it
/// lives and who shares it.
#[derive(Debug)]
pub struct IdCache {
    ids: DashMap<String, u64>,
    next_id: AtomicU64,
    metrics: Arc<PoolMetrics>,
}

impl IdCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(PoolMetrics::new()))
    }

    /// Creates an empty cache reporting hits and misses to `metrics`
    pub fn with_metrics(metrics: Arc<PoolMetrics>) -> Self {
        Self {
            ids: DashMap::new(),
            next_id: AtomicU64::new(1),
            metrics,
        }
    }

    /// Returns the id for `value`, assigning the next free one if unseen
    pub fn id_for<T: Serialize + ?Sized>(&self, value: &T) -> SearchResult<u64> {
        let key = serde_json::to_string(value)
            .map_err(|e| SearchError::serialization_error(e.to_string()))?;
        Ok(self.id_for_key(key))
    }

    /// Returns the id for an already canonical key
    pub fn id_for_key(&self, key: impl Into<String>) -> u64 {
        match self.ids.entry(key.into()) {
            Entry::Occupied(entry) => {
                self.metrics.record_cache_lookup(true);
                *entry.get()
            }
            Entry::Vacant(entry) => {
                self.metrics.record_cache_lookup(false);
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                *entry.insert(id)
            }
        }
    }

    /// Looks up an id without assigning one
    pub fn get<T: Serialize + ?Sized>(&self, value: &T) -> Option<u64> {
        let key = serde_json::to_string(value).ok()?;
        self.ids.get(&key).map(|id| *id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Forgets all keys; ids keep increasing so old ids are never reused
    pub fn clear(&self) {
        self.ids.clear();
    }

    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }
}

impl Default for IdCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchSpec;
    use std::thread;

    #[test]
    fn test_same_value_same_id() {
        let cache = IdCache::new();
        let a = cache.id_for(&SearchSpec::new("quick brown", 2)).unwrap();
        let b = cache.id_for(&SearchSpec::new("lazy dog", 2)).unwrap();
        let again = cache.id_for(&SearchSpec::new("quick brown", 2)).unwrap();

        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(again, a);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.metrics().cache_hits(), 1);
        assert_eq!(cache.metrics().cache_misses(), 2);
    }

    #[test]
    fn test_separate_caches_are_independent() {
        let first = IdCache::new();
        let second = IdCache::new();
        first.id_for("alpha").unwrap();
        first.id_for("beta").unwrap();
        assert_eq!(second.id_for("beta").unwrap(), 1);
        assert_eq!(second.get("alpha"), None);
    }

    #[test]
    fn test_clear_never_reuses_ids() {
        let cache = IdCache::new();
        assert_eq!(cache.id_for("x").unwrap(), 1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.id_for("x").unwrap(), 2);
    }

    #[test]
    fn test_concurrent_assignment_is_consistent() {
        let cache = Arc::new(IdCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    (0..50)
                        .map(|i| cache.id_for(&format!("key-{}", i)).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<Vec<u64>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for result in &results[1..] {
            assert_eq!(result, &results[0]);
        }
        assert_eq!(cache.len(), 50);
    }
}
