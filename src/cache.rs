//! Concurrent cache of the latest scalar signal values
//!
//! The cache is bookkeeping for hosts and diagnostics; the resolvers never
//! read it. Periodic sweeps evict entries that no longer belong to the
//! configured signal group, so a renamed leash does not grow the map
//! without bound.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::debug;

/// Latest observed value per signal name, with periodic eviction.
#[derive(Debug)]
pub struct SignalCache {
    values: DashMap<String, f32>,
    updates: AtomicU64,
    evictions: AtomicU64,
    cleanup_interval: u64,
}

impl SignalCache {
    /// Create a cache that sweeps every `cleanup_interval` updates.
    pub fn new(cleanup_interval: u64) -> Self {
        Self {
            values: DashMap::new(),
            updates: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            cleanup_interval: cleanup_interval.max(1),
        }
    }

    /// Upsert a value; every Nth update sweeps entries outside `base`.
    pub fn update(&self, name: &str, value: f32, base: &str) {
        self.values.insert(name.to_string(), value);
        let count = self.updates.fetch_add(1, Ordering::Relaxed) + 1;
        if count % self.cleanup_interval == 0 {
            self.cleanup(base);
        }
    }

    /// Evict entries whose key does not start with `base`.
    pub fn cleanup(&self, base: &str) {
        let before = self.values.len();
        self.values.retain(|key, _| key.starts_with(base));
        let evicted = before.saturating_sub(self.values.len());
        if evicted > 0 {
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
            debug!(evicted, base, "evicted stale signal cache entries");
        }
    }

    /// Latest value recorded under `name`.
    pub fn get(&self, name: &str) -> Option<f32> {
        self.values.get(name).map(|entry| *entry)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Total entries evicted by sweeps since creation.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Drop all entries without counting them as evictions.
    pub fn clear(&self) {
        self.values.clear();
    }
}
