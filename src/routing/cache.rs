//! Bounded LRU cache for resolved static routes.
//!
//! # Responsibilities
//! - Memoize `method + path` → resolved route for zero-parameter matches
//! - Evict the least-recently-used entry once capacity is exceeded
//! - Count hits and misses for observability
//!
//! # Design Decisions
//! - Entries live in a slot arena threaded by a doubly-linked list of indices
//! - One `Mutex` guards both `get` and `put`: promotion on read is a write
//! - The cache stores whatever it is given; the router decides what is cacheable

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::observability::metrics;

/// Default number of cached routes.
pub const ROUTE_CACHE_CAPACITY_DEFAULT: usize = 1024;

#[derive(Debug)]
struct Slot<V> {
    key: String,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Least-recently-used map from request keys to values.
///
/// `get` and `put` are O(1) on average. Not synchronized; see [`RouteCache`].
#[derive(Debug)]
pub struct LruCache<V> {
    capacity: usize,
    map: HashMap<String, usize>,
    slots: Vec<Slot<V>>,
    /// Most recently used.
    head: Option<usize>,
    /// Least recently used.
    tail: Option<usize>,
}

impl<V> LruCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Look up `key` and mark it most recently used.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let idx = *self.map.get(key)?;
        self.promote(idx);
        Some(&self.slots[idx].value)
    }

    /// Whether `key` is cached. Does not affect recency.
    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Insert or update `key`, then evict the LRU entry if over capacity.
    ///
    /// Returns the evicted key, if any.
    pub fn put(&mut self, key: String, value: V) -> Option<String> {
        if self.capacity == 0 {
            return None;
        }

        if let Some(&idx) = self.map.get(&key) {
            self.slots[idx].value = value;
            self.promote(idx);
            return None;
        }

        if self.map.len() >= self.capacity {
            // Reuse the tail slot for the new entry
            let idx = self.tail?;
            self.unlink(idx);
            let slot = &mut self.slots[idx];
            let evicted = std::mem::replace(&mut slot.key, key.clone());
            slot.value = value;
            self.map.remove(&evicted);
            self.map.insert(key, idx);
            self.push_front(idx);
            return Some(evicted);
        }

        let idx = self.slots.len();
        self.slots.push(Slot {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.map.insert(key, idx);
        self.push_front(idx);
        None
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.slots.clear();
        self.head = None;
        self.tail = None;
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys = Vec::with_capacity(self.map.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            keys.push(self.slots[idx].key.as_str());
            cursor = self.slots[idx].next;
        }
        keys
    }

    fn promote(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
        self.slots[idx].prev = None;
        self.slots[idx].next = None;
    }

    fn push_front(&mut self, idx: usize) {
        self.slots[idx].prev = None;
        self.slots[idx].next = self.head;
        if let Some(old) = self.head {
            self.slots[old].prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub capacity: usize,
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

/// Thread-safe LRU shared by all request tasks.
#[derive(Debug)]
pub struct RouteCache<V> {
    inner: Mutex<LruCache<V>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<V: Clone> RouteCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Cache key for a request.
    ///
    /// Method tokens cannot contain a space, so `"{method} {path}"` is unambiguous.
    pub fn key(method: &str, path: &str) -> String {
        let mut key = String::with_capacity(method.len() + path.len() + 1);
        key.push_str(method);
        key.push(' ');
        key.push_str(path);
        key
    }

    /// Clone out the cached value for `key`, promoting it.
    pub fn get(&self, key: &str) -> Option<V> {
        let found = self
            .inner
            .lock()
            .expect("route cache mutex poisoned")
            .get(key)
            .cloned();

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            metrics::record_cache_lookup(true);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            metrics::record_cache_lookup(false);
        }
        found
    }

    pub fn put(&self, key: String, value: V) {
        let evicted = self
            .inner
            .lock()
            .expect("route cache mutex poisoned")
            .put(key, value);

        if let Some(evicted) = evicted {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(key = %evicted, "Route cache eviction");
        }
    }

    pub fn clear(&self) {
        self.inner.lock().expect("route cache mutex poisoned").clear();
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity() > 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().expect("route cache mutex poisoned");
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: inner.len(),
            capacity: self.capacity,
        }
    }
}

impl<V: Clone> Default for RouteCache<V> {
    fn default() -> Self {
        Self::new(ROUTE_CACHE_CAPACITY_DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = LruCache::new(3);
        cache.put("a".into(), 1);
        cache.put("b".into(), 2);
        cache.put("c".into(), 3);

        assert_eq!(cache.put("d".into(), 4), Some("a".to_string()));
        assert!(!cache.contains("a"));
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.keys(), vec!["d", "c", "b"]);
    }

    #[test]
    fn test_get_protects_from_eviction() {
        let mut cache = LruCache::new(3);
        cache.put("a".into(), 1);
        cache.put("b".into(), 2);
        cache.put("c".into(), 3);

        assert_eq!(cache.get("a"), Some(&1));
        assert_eq!(cache.put("d".into(), 4), Some("b".to_string()));
        assert!(cache.contains("a"));
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.keys(), vec!["d", "a", "c"]);
    }

    #[test]
    fn test_put_existing_updates_and_promotes() {
        let mut cache = LruCache::new(2);
        cache.put("a".into(), 1);
        cache.put("b".into(), 2);

        assert_eq!(cache.put("a".into(), 10), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.put("c".into(), 3), Some("b".to_string()));
        assert_eq!(cache.get("a"), Some(&10));
    }

    #[test]
    fn test_miss_has_no_side_effects() {
        let mut cache = LruCache::new(2);
        cache.put("a".into(), 1);
        cache.put("b".into(), 2);

        assert_eq!(cache.get("zzz"), None);
        assert_eq!(cache.keys(), vec!["b", "a"]);
    }

    #[test]
    fn test_single_slot_and_zero_capacity() {
        let mut one = LruCache::new(1);
        one.put("a".into(), 1);
        assert_eq!(one.put("b".into(), 2), Some("a".to_string()));
        assert_eq!(one.get("b"), Some(&2));
        assert_eq!(one.keys(), vec!["b"]);

        let mut none = LruCache::new(0);
        assert_eq!(none.put("a".into(), 1), None);
        assert!(none.is_empty());
        assert_eq!(none.get("a"), None);
    }

    #[test]
    fn test_route_cache_counts() {
        let cache: RouteCache<u32> = RouteCache::new(2);
        let key = RouteCache::<u32>::key("GET", "/health");
        assert_eq!(key, "GET /health");

        assert_eq!(cache.get(&key), None);
        cache.put(key.clone(), 7);
        assert_eq!(cache.get(&key), Some(7));
        cache.put("GET/a".into(), 1);
        cache.put("GET/b".into(), 2);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.entries, 2);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_keys_separate_method_from_path() {
        let custom = RouteCache::<u32>::key("PURGE/", "x");
        let plain = RouteCache::<u32>::key("PURGE", "/x");
        assert_ne!(custom, plain);

        let cache: RouteCache<u32> = RouteCache::new(4);
        cache.put(plain.clone(), 1);
        assert_eq!(cache.get(&custom), None);
        assert_eq!(cache.get(&plain), Some(1));
    }

    #[test]
    fn test_disabled_cache_reports_capacity_without_entries() {
        let cache: RouteCache<u32> = RouteCache::new(0);
        assert!(!cache.is_enabled());
        assert_eq!(cache.capacity(), 0);
        cache.put(RouteCache::<u32>::key("GET", "/a"), 1);
        assert_eq!(cache.stats().entries, 0);
        assert!(RouteCache::<u32>::new(3).is_enabled());
    }

    #[test]
    fn test_concurrent_access_keeps_list_consistent() {
        let cache: Arc<RouteCache<usize>> = Arc::new(RouteCache::new(16));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..500 {
                        let key = format!("GET/{}", (t * 7 + i) % 40);
                        if cache.get(&key).is_none() {
                            cache.put(key, i);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let inner = cache.inner.lock().unwrap();
        assert_eq!(inner.len(), 16);
        assert_eq!(inner.keys().len(), 16);
    }
}
