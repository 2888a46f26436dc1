//! Result cache: memoized result sets keyed by query hash.
//!
//! Shares the plan cache's TTL + LRU structure, with one extra rule: result
//! sets larger than the configured row cap are never cached. Each entry
//! records the objects its query referenced so invalidation by object name
//! removes exactly the dependent entries (`clear` remains the pessimistic
//! fallback).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use objql_ir::Row;

use super::hash::QueryHash;

struct CachedResult {
    rows: Arc<Vec<Row>>,
    objects: Vec<String>,
    created_at: Instant,
}

/// Result cache statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResultCacheStatistics {
    /// Number of live entries.
    pub total_entries: usize,
    /// Lifetime hit count.
    pub hits: u64,
    /// Lifetime miss count.
    pub misses: u64,
}

/// Thread-safe, TTL- and size-bounded result cache.
pub struct ResultCache {
    entries: DashMap<QueryHash, Arc<CachedResult>>,
    /// Front = most recently used.
    lru: Mutex<VecDeque<QueryHash>>,
    capacity: usize,
    ttl: Duration,
    max_rows: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    /// Create a cache with the given capacity, TTL, and row cap.
    pub fn new(capacity: usize, ttl: Duration, max_rows: usize) -> Self {
        Self {
            entries: DashMap::new(),
            lru: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            ttl,
            max_rows,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a cached result set if present and unexpired.
    pub fn get(&self, key: &QueryHash) -> Option<Arc<Vec<Row>>> {
        let entry = match self.entries.get(key) {
            Some(entry) => Arc::clone(&entry),
            None => {
                self.misses.fetch_add(1, AtomicOrdering::Relaxed);
                return None;
            }
        };

        if entry.created_at.elapsed() >= self.ttl {
            self.remove(key);
            self.misses.fetch_add(1, AtomicOrdering::Relaxed);
            return None;
        }

        self.touch(key);
        self.hits.fetch_add(1, AtomicOrdering::Relaxed);
        Some(Arc::clone(&entry.rows))
    }

    /// Insert a result set unless it exceeds the row cap.
    ///
    /// `objects` are the object names the producing query referenced.
    /// Returns whether the set was cached.
    pub fn insert(&self, key: QueryHash, rows: Vec<Row>, objects: Vec<String>) -> bool {
        if rows.len() > self.max_rows {
            debug!(
                rows = rows.len(),
                max = self.max_rows,
                "result set exceeds cache cap, not caching"
            );
            return false;
        }

        let mut lru = self.lru.lock();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            while let Some(tail) = lru.pop_back() {
                if self.entries.remove(&tail).is_some() {
                    break;
                }
            }
        }

        lru.retain(|k| k != &key);
        lru.push_front(key.clone());
        self.entries.insert(
            key,
            Arc::new(CachedResult {
                rows: Arc::new(rows),
                objects,
                created_at: Instant::now(),
            }),
        );
        true
    }

    /// Remove every entry whose query referenced the given object.
    pub fn invalidate_object(&self, object: &str) -> usize {
        let stale: Vec<QueryHash> = self
            .entries
            .iter()
            .filter(|entry| entry.value().objects.iter().any(|o| o == object))
            .map(|entry| entry.key().clone())
            .collect();
        for key in &stale {
            self.remove(key);
        }
        stale.len()
    }

    /// Evict every expired entry; returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let expired: Vec<QueryHash> = self
            .entries
            .iter()
            .filter(|entry| entry.value().created_at.elapsed() >= self.ttl)
            .map(|entry| entry.key().clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    /// Drop all entries.
    pub fn clear(&self) {
        let mut lru = self.lru.lock();
        self.entries.clear();
        lru.clear();
    }

    /// Build a statistics report.
    pub fn statistics(&self) -> ResultCacheStatistics {
        ResultCacheStatistics {
            total_entries: self.entries.len(),
            hits: self.hits.load(AtomicOrdering::Relaxed),
            misses: self.misses.load(AtomicOrdering::Relaxed),
        }
    }

    fn touch(&self, key: &QueryHash) {
        let mut lru = self.lru.lock();
        lru.retain(|k| k != key);
        lru.push_front(key.clone());
    }

    fn remove(&self, key: &QueryHash) {
        let mut lru = self.lru.lock();
        self.entries.remove(key);
        lru.retain(|k| k != key);
    }
}
