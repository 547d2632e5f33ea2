//! Bounded fitness cache.
//!
//! Memoizes fitness by chromosome signature so islands re-evaluating
//! migrants or repeated offspring skip the decode-evaluate-score path.
//! On overflow roughly 20% of entries are evicted at random; random
//! eviction trades recency precision for a tiny, contention-free
//! critical section. One cache is created per optimization call and
//! dropped with it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use rand::prelude::IndexedRandom;

/// Default number of cached signatures.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Concurrency-safe signature-to-fitness map with hit diagnostics.
#[derive(Debug)]
pub struct FitnessCache {
    entries: Mutex<HashMap<String, f64>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for FitnessCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl FitnessCache {
    /// Creates a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Looks up a signature, counting the hit or miss.
    pub fn get(&self, signature: &str) -> Option<f64> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match entries.get(signature) {
            Some(&fitness) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(fitness)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores a fitness, evicting ~20% at random when full.
    pub fn put(&self, signature: String, fitness: f64) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if entries.len() >= self.capacity && !entries.contains_key(&signature) {
            let evict = (self.capacity / 5).max(1);
            let keys: Vec<String> = entries.keys().cloned().collect();
            let mut rng = rand::rng();
            for key in keys.choose_multiple(&mut rng, evict) {
                entries.remove(key);
            }
        }
        entries.insert(signature, fitness);
    }

    /// Entries currently cached.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured maximum entry count.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// (hits, misses) since creation.
    pub fn counters(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    /// Hits over lookups, 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let (hits, misses) = self.counters();
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}
