//! Bounded in-memory result cache with strict LRU eviction.
//!
//! # Purpose
//! Caches solved pack combinations keyed by the canonical `(amount, sizes)`
//! string so repeated calculations skip the solver. The cache is shared
//! across request handlers; all operations are constant-time after the map
//! lookup.
//!
//! # Concurrency
//! The map and recency chain live behind one `parking_lot::RwLock`. The read
//! path takes the shared lock only long enough to look up and clone the
//! payload, bumps the hit/miss counters with atomics outside any lock, then
//! takes the exclusive lock briefly to promote the entry. Writes, evictions,
//! and clears hold the exclusive lock for the whole operation.
//!
//! # Structure
//! Entries are slots in an arena `Vec` linked into a doubly linked recency
//! chain by index, head = most recently used. Index links keep every
//! operation O(1) without raw pointers; freed slots are recycled through a
//! free list.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Default entry capacity when none is configured.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Point-in-time cache counters.
///
/// `hits` and `misses` are monotonic between [`ResultCache::clear`] calls and
/// sum to the number of completed `get` operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_ratio: f64,
    pub size: usize,
}

/// Capability set every cache backend provides. The coordinator only speaks
/// this trait, so a different backend (or [`NoopCache`] to disable caching)
/// drops in without touching request handling.
pub trait ResultCache<V>: Send + Sync {
    /// Look up a key, counting a hit or miss. A present entry is promoted to
    /// most recently used; an expired entry counts as a miss.
    fn get(&self, key: &str) -> Option<V>;
    /// Insert or replace a value with an absolute expiry `ttl` from now,
    /// evicting the least recently used entry when at capacity.
    fn set(&self, key: String, value: V, ttl: Duration);
    /// Drop every entry and reset the counters.
    fn clear(&self);
    fn stats(&self) -> CacheStats;
}

/// Canonical cache key for an amount and a pack-size set.
///
/// Sizes are joined ascending, so two requests that differ only in the order
/// of the configured sizes share one key.
pub fn cache_key(amount: u64, sizes: &[u64]) -> String {
    let mut sorted = sizes.to_vec();
    sorted.sort_unstable();
    let mut key = String::with_capacity(32 + sorted.len() * 6);
    let _ = write!(key, "calc:{amount}:");
    for (i, size) in sorted.iter().enumerate() {
        if i > 0 {
            key.push(',');
        }
        let _ = write!(key, "{size}");
    }
    key
}

struct Slot<V> {
    key: String,
    value: V,
    expires_at: Instant,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Single-threaded core: map + arena-backed recency chain.
struct LruCore<V> {
    map: HashMap<String, usize>,
    slots: Vec<Option<Slot<V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    capacity: usize,
}

impl<V> LruCore<V> {
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            capacity,
        }
    }

    fn slot(&self, idx: usize) -> &Slot<V> {
        self.slots[idx].as_ref().expect("linked slot is occupied")
    }

    fn slot_mut(&mut self, idx: usize) -> &mut Slot<V> {
        self.slots[idx].as_mut().expect("linked slot is occupied")
    }

    /// Unlink a slot from the chain without touching the map.
    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = self.slot(idx);
            (slot.prev, slot.next)
        };
        match prev {
            Some(p) => self.slot_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slot_mut(n).prev = prev,
            None => self.tail = prev,
        }
    }

    /// Link a slot at the head (most recently used position).
    fn attach_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let slot = self.slot_mut(idx);
            slot.prev = None;
            slot.next = old_head;
        }
        match old_head {
            Some(h) => self.slot_mut(h).prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn promote(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.detach(idx);
        self.attach_front(idx);
    }

    /// Drop the tail entry (least recently used) and recycle its slot.
    fn evict_tail(&mut self) {
        let Some(tail) = self.tail else { return };
        self.detach(tail);
        if let Some(slot) = self.slots[tail].take() {
            self.map.remove(&slot.key);
        }
        self.free.push(tail);
    }

    fn insert(&mut self, key: String, value: V, expires_at: Instant) {
        if self.capacity == 0 {
            return;
        }
        if let Some(&idx) = self.map.get(&key) {
            let slot = self.slot_mut(idx);
            slot.value = value;
            slot.expires_at = expires_at;
            self.promote(idx);
            return;
        }
        if self.map.len() >= self.capacity {
            self.evict_tail();
        }
        let slot = Slot {
            key: key.clone(),
            value,
            expires_at,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.map.insert(key, idx);
        self.attach_front(idx);
    }
}

/// Thread-safe LRU cache over [`LruCore`].
pub struct MemoryCache<V> {
    core: RwLock<LruCore<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> MemoryCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            core: RwLock::new(LruCore::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<V: Clone + Send + Sync> ResultCache<V> for MemoryCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        // Shared lock only for lookup + payload capture. Expired entries are
        // misses; they stay in place until overwritten or evicted.
        let captured = {
            let core = self.core.read();
            core.map.get(key).and_then(|&idx| {
                let slot = core.slot(idx);
                (slot.expires_at > now).then(|| (idx, slot.value.clone()))
            })
        };
        let Some((idx, value)) = captured else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };
        self.hits.fetch_add(1, Ordering::Relaxed);
        // Exclusive lock only for the constant-time promotion. The entry may
        // have been evicted or replaced between the two locks; promote only
        // while the key still maps to the slot we read.
        let mut core = self.core.write();
        if core.map.get(key) == Some(&idx) {
            core.promote(idx);
        }
        Some(value)
    }

    fn set(&self, key: String, value: V, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.core.write().insert(key, value, expires_at);
    }

    fn clear(&self) {
        let mut core = self.core.write();
        let capacity = core.capacity;
        *core = LruCore::new(capacity);
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    fn stats(&self) -> CacheStats {
        let size = self.core.read().map.len();
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        let hit_ratio = if lookups > 0 {
            hits as f64 / lookups as f64
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_ratio,
            size,
        }
    }
}

/// Backend that caches nothing, for deployments that disable caching.
pub struct NoopCache;

impl<V: Clone + Send + Sync> ResultCache<V> for NoopCache {
    fn get(&self, _key: &str) -> Option<V> {
        None
    }

    fn set(&self, _key: String, _value: V, _ttl: Duration) {}

    fn clear(&self) {}

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: 0,
            misses: 0,
            hit_ratio: 0.0,
            size: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const TTL: Duration = Duration::from_secs(3600);

    #[test]
    fn key_is_canonical_over_size_order() {
        assert_eq!(cache_key(500, &[1000, 250, 500]), "calc:500:250,500,1000");
        assert_eq!(
            cache_key(500, &[250, 500, 1000]),
            cache_key(500, &[1000, 500, 250])
        );
        assert_ne!(cache_key(500, &[250]), cache_key(501, &[250]));
        assert_ne!(cache_key(500, &[250]), cache_key(500, &[250, 500]));
    }

    #[test]
    fn get_counts_hits_and_misses() {
        let cache = MemoryCache::new(4);
        assert_eq!(cache.get("a"), None);
        cache.set("a".into(), 1u64, TTL);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.size, 1);
        assert!((stats.hit_ratio - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn eviction_is_strict_lru() {
        let cache = MemoryCache::new(3);
        for (k, v) in [("a", 1u64), ("b", 2), ("c", 3)] {
            cache.set(k.into(), v, TTL);
        }
        // Touch "a" so "b" becomes the tail, then overflow.
        assert_eq!(cache.get("a"), Some(1));
        cache.set("d".into(), 4, TTL);

        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.get("d"), Some(4));
        assert_eq!(cache.stats().size, 3);
    }

    #[test]
    fn capacity_bound_holds_under_distinct_inserts() {
        let cache = MemoryCache::new(5);
        for i in 0..50u64 {
            cache.set(format!("k{i}"), i, TTL);
        }
        assert_eq!(cache.stats().size, 5);
        // Exactly the five most recent keys survive.
        for i in 0..45u64 {
            assert_eq!(cache.get(&format!("k{i}")), None);
        }
        for i in 45..50u64 {
            assert_eq!(cache.get(&format!("k{i}")), Some(i));
        }
    }

    #[test]
    fn set_updates_value_and_promotes() {
        let cache = MemoryCache::new(2);
        cache.set("a".into(), 1u64, TTL);
        cache.set("b".into(), 2, TTL);
        // Rewriting "a" promotes it, so the overflow evicts "b".
        cache.set("a".into(), 10, TTL);
        cache.set("c".into(), 3, TTL);

        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn expired_entries_read_as_misses() {
        let cache = MemoryCache::new(4);
        cache.set("a".into(), 1u64, Duration::ZERO);
        assert_eq!(cache.get("a"), None);
        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
        // A fresh set for the same key displaces the expired entry.
        cache.set("a".into(), 2, TTL);
        assert_eq!(cache.get("a"), Some(2));
    }

    #[test]
    fn clear_resets_entries_and_counters() {
        let cache = MemoryCache::new(4);
        cache.set("a".into(), 1u64, TTL);
        cache.get("a");
        cache.get("missing");
        cache.clear();

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.size, 0);
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn zero_capacity_accepts_nothing() {
        let cache = MemoryCache::new(0);
        cache.set("a".into(), 1u64, TTL);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn counters_account_for_every_lookup() {
        let cache = Arc::new(MemoryCache::new(16));
        let mut handles = Vec::new();
        for t in 0..4u64 {
            let cache = Arc::clone(&cache);
            handles.push(std::thread::spawn(move || {
                for i in 0..250u64 {
                    let key = format!("k{}", (t * 250 + i) % 32);
                    if cache.get(&key).is_none() {
                        cache.set(key, i, TTL);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().expect("worker");
        }
        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, 1000);
        assert!(stats.size <= 16);
    }

    #[test]
    fn noop_cache_stores_nothing() {
        let cache = NoopCache;
        cache.set("a".into(), 1u64, TTL);
        assert_eq!(ResultCache::<u64>::get(&cache, "a"), None);
        assert_eq!(ResultCache::<u64>::stats(&cache).misses, 0);
    }
}
