//! Plan cache with TTL and LRU eviction.
//!
//! Entries live in a concurrent map for lock-free reads of the payload; a
//! small mutex guards the LRU list so list order and map content stay
//! consistent. A periodic sweep (driven by the engine) evicts expired
//! entries that were never touched again.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;

use super::hash::QueryHash;
use super::optimizer::Plan;

/// A cached plan with bookkeeping.
pub struct CachedPlan {
    /// The optimized plan.
    pub plan: Arc<Plan>,
    /// When the entry was inserted.
    pub created_at: Instant,
    /// When the entry was last returned.
    pub last_accessed_at: Mutex<Instant>,
    /// Number of cache hits for this entry.
    pub hits: AtomicU64,
}

impl CachedPlan {
    fn new(plan: Arc<Plan>) -> Self {
        let now = Instant::now();
        Self {
            plan,
            created_at: now,
            last_accessed_at: Mutex::new(now),
            hits: AtomicU64::new(0),
        }
    }
}

/// A high-hit entry in the statistics report.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TopPlan {
    /// Plan id.
    pub plan_id: String,
    /// Hit count.
    pub hits: u64,
}

/// Plan cache statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PlanCacheStatistics {
    /// Number of live entries.
    pub total_entries: usize,
    /// Hits summed over live entries.
    pub total_hits: u64,
    /// Average hits per live entry.
    pub avg_hits: f64,
    /// Age of the oldest live entry.
    pub oldest_entry_age: Option<Duration>,
    /// Age of the most recently inserted live entry.
    pub most_recent_entry_age: Option<Duration>,
    /// Up to five entries with the most hits.
    pub top_plans: Vec<TopPlan>,
}

/// Thread-safe, TTL- and size-bounded plan cache.
pub struct PlanCache {
    entries: DashMap<QueryHash, Arc<CachedPlan>>,
    /// Front = most recently used.
    lru: Mutex<VecDeque<QueryHash>>,
    capacity: usize,
    ttl: Duration,
}

impl PlanCache {
    /// Create a cache with the given capacity and TTL.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            lru: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Get a plan if present and unexpired; touches the LRU order.
    pub fn get(&self, key: &QueryHash) -> Option<Arc<Plan>> {
        let entry = Arc::clone(self.entries.get(key)?.value());

        if entry.created_at.elapsed() >= self.ttl {
            self.remove(key);
            return None;
        }

        entry.hits.fetch_add(1, AtomicOrdering::Relaxed);
        *entry.last_accessed_at.lock() = Instant::now();
        self.touch(key);
        Some(Arc::clone(&entry.plan))
    }

    /// Insert a plan, evicting the LRU tail at capacity.
    pub fn insert(&self, key: QueryHash, plan: Arc<Plan>) {
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
        self.entries.insert(key, Arc::new(CachedPlan::new(plan)));
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

    /// Remove every entry whose plan references the given object.
    pub fn invalidate_object(&self, object: &str) -> usize {
        let stale: Vec<QueryHash> = self
            .entries
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .plan
                    .query
                    .referenced_objects()
                    .iter()
                    .any(|o| o == object)
            })
            .map(|entry| entry.key().clone())
            .collect();
        for key in &stale {
            self.remove(key);
        }
        stale.len()
    }

    /// Drop all entries.
    pub fn clear(&self) {
        let mut lru = self.lru.lock();
        self.entries.clear();
        lru.clear();
    }

    /// Build a statistics report.
    pub fn statistics(&self) -> PlanCacheStatistics {
        let mut total_hits = 0u64;
        let mut oldest: Option<Instant> = None;
        let mut newest: Option<Instant> = None;
        let mut top: Vec<TopPlan> = Vec::new();

        for entry in self.entries.iter() {
            let cached = entry.value();
            let hits = cached.hits.load(AtomicOrdering::Relaxed);
            total_hits += hits;
            if oldest.map_or(true, |t| cached.created_at < t) {
                oldest = Some(cached.created_at);
            }
            if newest.map_or(true, |t| cached.created_at > t) {
                newest = Some(cached.created_at);
            }
            top.push(TopPlan {
                plan_id: cached.plan.plan_id.clone(),
                hits,
            });
        }

        top.sort_by(|a, b| b.hits.cmp(&a.hits));
        top.truncate(5);

        let total_entries = self.entries.len();
        PlanCacheStatistics {
            total_entries,
            total_hits,
            avg_hits: if total_entries > 0 {
                total_hits as f64 / total_entries as f64
            } else {
                0.0
            },
            oldest_entry_age: oldest.map(|t| t.elapsed()),
            most_recent_entry_age: newest.map(|t| t.elapsed()),
            top_plans: top,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DataType, FieldMetadata, ObjectMetadata, StaticCatalog};
    use crate::query::Optimizer;
    use objql_ir::Query;

    fn catalog() -> StaticCatalog {
        let mut catalog = StaticCatalog::new();
        for name in ["A", "B", "C"] {
            catalog.register(
                ObjectMetadata::new(name, name.to_lowercase())
                    .with_field(FieldMetadata::new("Id", "id", DataType::Id))
                    .with_row_count(100),
            );
        }
        catalog
    }

    fn plan_for(catalog: &StaticCatalog, object: &str) -> (QueryHash, Arc<Plan>) {
        let query = Query::select(object, vec!["Id"]);
        let key = QueryHash::compute(&query, None);
        let plan = Optimizer::new(catalog, catalog).optimize(query).unwrap();
        (key, Arc::new(plan))
    }

    #[test]
    fn test_insert_and_get_within_ttl() {
        let catalog = catalog();
        let cache = PlanCache::new(10, Duration::from_secs(60));
        let (key, plan) = plan_for(&catalog, "A");

        cache.insert(key.clone(), plan);
        let cached = cache.get(&key).unwrap();
        assert_eq!(cached.query.from_object, "A");
        assert_eq!(cache.statistics().total_hits, 1);
    }

    #[test]
    fn test_expired_entry_misses_and_is_evicted() {
        let catalog = catalog();
        let cache = PlanCache::new(10, Duration::ZERO);
        let (key, plan) = plan_for(&catalog, "A");

        cache.insert(key.clone(), plan);
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.statistics().total_entries, 0);
    }

    #[test]
    fn test_lru_discipline() {
        let catalog = catalog();
        let cache = PlanCache::new(2, Duration::from_secs(60));
        let (key_a, plan_a) = plan_for(&catalog, "A");
        let (key_b, plan_b) = plan_for(&catalog, "B");
        let (key_c, plan_c) = plan_for(&catalog, "C");

        cache.insert(key_a.clone(), plan_a);
        cache.insert(key_b.clone(), plan_b);

        // Touch A so B becomes the least recently used.
        cache.get(&key_a);

        cache.insert(key_c.clone(), plan_c);
        assert_eq!(cache.statistics().total_entries, 2);
        assert!(cache.get(&key_a).is_some());
        assert!(cache.get(&key_c).is_some());
        assert!(cache.get(&key_b).is_none());
    }

    #[test]
    fn test_capacity_eviction_without_touches_drops_first_insert() {
        let catalog = catalog();
        let cache = PlanCache::new(2, Duration::from_secs(60));
        let (key_a, plan_a) = plan_for(&catalog, "A");
        let (key_b, plan_b) = plan_for(&catalog, "B");
        let (key_c, plan_c) = plan_for(&catalog, "C");

        cache.insert(key_a.clone(), plan_a);
        cache.insert(key_b.clone(), plan_b);
        cache.insert(key_c.clone(), plan_c);

        assert!(cache.get(&key_a).is_none());
        assert!(cache.get(&key_b).is_some());
        assert!(cache.get(&key_c).is_some());
    }

    #[test]
    fn test_sweep_expired() {
        let catalog = catalog();
        let cache = PlanCache::new(10, Duration::ZERO);
        let (key_a, plan_a) = plan_for(&catalog, "A");
        let (key_b, plan_b) = plan_for(&catalog, "B");

        cache.insert(key_a, plan_a);
        cache.insert(key_b, plan_b);
        assert_eq!(cache.sweep_expired(), 2);
        assert_eq!(cache.statistics().total_entries, 0);
    }

    #[test]
    fn test_invalidate_object() {
        let catalog = catalog();
        let cache = PlanCache::new(10, Duration::from_secs(60));
        let (key_a, plan_a) = plan_for(&catalog, "A");
        let (key_b, plan_b) = plan_for(&catalog, "B");

        cache.insert(key_a.clone(), plan_a);
        cache.insert(key_b.clone(), plan_b);

        assert_eq!(cache.invalidate_object("A"), 1);
        assert!(cache.get(&key_a).is_none());
        assert!(cache.get(&key_b).is_some());
    }

    #[test]
    fn test_statistics() {
        let catalog = catalog();
        let cache = PlanCache::new(10, Duration::from_secs(60));
        let (key_a, plan_a) = plan_for(&catalog, "A");
        let (key_b, plan_b) = plan_for(&catalog, "B");

        cache.insert(key_a.clone(), plan_a);
        cache.insert(key_b, plan_b);
        cache.get(&key_a);
        cache.get(&key_a);

        let stats = cache.statistics();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.total_hits, 2);
        assert!((stats.avg_hits - 1.0).abs() < f64::EPSILON);
        assert!(stats.oldest_entry_age.is_some());
        assert_eq!(stats.top_plans.len(), 2);
        assert_eq!(stats.top_plans[0].hits, 2);
    }

    #[test]
    fn test_clear() {
        let catalog = catalog();
        let cache = PlanCache::new(10, Duration::from_secs(60));
        let (key_a, plan_a) = plan_for(&catalog, "A");
        cache.insert(key_a, plan_a);

        cache.clear();
        assert_eq!(cache.statistics().total_entries, 0);
    }
}
