//! Resource cache: key -> decoded resource
//!
//! Authoritative store of everything the loader has decoded.
//! - O(1) lookup by key
//! - Insert-once: `put` never replaces an existing entry
//! - Explicit eviction only (`evict`, `clear`), no LRU
//! - Memory tracking via `MemoryBudget`
//!
//! Entries are stored as `Arc<R>`; requesters get clones of that handle.
//! Evicting drops the cache's handle, the resource itself is released when
//! the last holder lets go.

use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::budget::MemoryBudget;
use crate::entities::Resource;
use crate::error::CacheError;

/// Cache statistics for monitoring
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.hits() + self.misses()
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 { 0.0 } else { self.hits() as f64 / total as f64 }
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// Decoded resources by key
#[derive(Debug)]
pub struct ResourceCache<R> {
    entries: Mutex<HashMap<String, Arc<R>>>,
    budget: Arc<MemoryBudget>,
    stats: Arc<CacheStats>,
}

impl<R: Resource> ResourceCache<R> {
    pub fn new(budget: Arc<MemoryBudget>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            budget,
            stats: Arc::new(CacheStats::new()),
        }
    }

    /// Look up a resource. No side effects (stats are recorded by the caller).
    pub fn try_get(&self, key: &str) -> Option<Arc<R>> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    /// Insert a freshly decoded resource.
    ///
    /// Rejected if the key is already cached; the existing entry is kept
    /// untouched and the new resource is dropped.
    pub fn put(&self, key: &str, resource: R) -> Result<Arc<R>, CacheError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.contains_key(key) {
            return Err(CacheError::AlreadyCached(key.to_string()));
        }

        let size = resource.mem();
        let resource = Arc::new(resource);
        entries.insert(key.to_string(), Arc::clone(&resource));
        // Track memory while holding the lock so evict can't interleave
        self.budget.add(size);

        debug!("Cached '{}' ({} bytes, {} entries)", key, size, entries.len());
        Ok(resource)
    }

    /// Atomically insert, or return the entry that got there first.
    /// Returns (resource, was_inserted).
    pub fn put_or_get(&self, key: &str, resource: R) -> (Arc<R>, bool) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = entries.get(key) {
            debug!("'{}' already cached, dropping duplicate decode", key);
            return (Arc::clone(existing), false);
        }

        let size = resource.mem();
        let resource = Arc::new(resource);
        entries.insert(key.to_string(), Arc::clone(&resource));
        self.budget.add(size);

        debug!("Cached '{}' ({} bytes, {} entries)", key, size, entries.len());
        (resource, true)
    }

    /// Remove and release a resource. Returns false if it wasn't cached.
    pub fn evict(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let Some(resource) = entries.remove(key) else {
            return false;
        };

        let size = resource.mem();
        self.budget.free(size);
        debug!(
            "Evicted '{}' ({} bytes freed, {} outstanding handles)",
            key,
            size,
            Arc::strong_count(&resource) - 1
        );
        true
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let count = entries.len();
        for (_, resource) in entries.drain() {
            self.budget.free(resource.mem());
        }
        debug!("Cleared resource cache ({} entries)", count);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    pub fn budget(&self) -> &MemoryBudget {
        &self.budget
    }
}
