//! LRU+TTL cache (C3), grounded on the teacher's `performance/cache.rs`
//! `Cache<K, V>` but upgraded from access-count eviction to true LRU order,
//! since the spec requires MRU/LRU semantics rather than least-accessed
//! eviction.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    created_at: Instant,
    hits: u64,
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    /// Ordered oldest (front, LRU) to newest (back, MRU).
    order: VecDeque<K>,
    hits: u64,
    misses: u64,
}

/// Thread-safe LRU+TTL cache keyed by any `Hash + Eq + Clone` type.
pub struct LruTtlCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    capacity: usize,
    ttl: Duration,
}

impl<K, V> LruTtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                hits: 0,
                misses: 0,
            }),
            capacity,
            ttl,
        }
    }

    /// On hit, moves the key to the MRU end and increments its hit
    /// counter. On miss (absent or expired), the entry is dropped.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock().unwrap();
        let expired = inner
            .entries
            .get(key)
            .map(|e| e.created_at.elapsed() > self.ttl)
            .unwrap_or(false);

        if expired {
            inner.entries.remove(key);
            inner.order.retain(|k| k != key);
        }

        if let Some(entry) = inner.entries.get_mut(key) {
            entry.hits += 1;
            inner.hits += 1;
            inner.order.retain(|k| k != key);
            inner.order.push_back(key.clone());
            Some(entry.value.clone())
        } else {
            inner.misses += 1;
            None
        }
    }

    /// Sweeps expired entries first; if still at capacity, evicts the LRU
    /// entry; then inserts the new value at the MRU end.
    pub fn set(&self, key: K, value: V) {
        let mut inner = self.inner.lock().unwrap();
        let ttl = self.ttl;
        let expired_keys: Vec<K> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.created_at.elapsed() > ttl)
            .map(|(k, _)| k.clone())
            .collect();
        for k in &expired_keys {
            inner.entries.remove(k);
            inner.order.retain(|existing| existing != k);
        }

        if inner.entries.len() >= self.capacity && !inner.entries.contains_key(&key) {
            if let Some(lru_key) = inner.order.pop_front() {
                inner.entries.remove(&lru_key);
            }
        }

        inner.order.retain(|k| k != &key);
        inner.order.push_back(key.clone());
        inner.entries.insert(
            key,
            Entry {
                value,
                created_at: Instant::now(),
                hits: 0,
            },
        );
    }

    pub fn remove(&self, key: &K) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.remove(key);
        inner.order.retain(|k| k != key);
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap();
        CacheStats {
            size: inner.entries.len(),
            capacity: self.capacity,
            hits: inner.hits,
            misses: inner.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_then_miss_after_ttl() {
        let cache = LruTtlCache::new(10, Duration::from_millis(20));
        cache.set("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get(&"a".to_string()), None);
    }

    #[test]
    fn test_eviction_is_lru_not_most_recently_accessed() {
        let cache = LruTtlCache::new(2, Duration::from_secs(60));
        cache.set("a".to_string(), 1);
        cache.set("b".to_string(), 2);
        // Touch "a" so "b" becomes LRU.
        cache.get(&"a".to_string());
        cache.set("c".to_string(), 3);
        assert_eq!(cache.get(&"b".to_string()), None);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"c".to_string()), Some(3));
    }

    #[test]
    fn test_stats_hit_rate() {
        let cache: LruTtlCache<String, i32> = LruTtlCache::new(10, Duration::from_secs(60));
        cache.set("a".to_string(), 1);
        cache.get(&"a".to_string());
        cache.get(&"missing".to_string());
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }
}
