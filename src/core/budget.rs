//! Memory budget for decoded resources
//!
//! **Why**: decoded textures are far larger than their encoded bytes; on
//! constrained devices the cache has to know how close it is to the limit.
//! The budget only tracks and reports. Nothing is evicted automatically,
//! resources leave the cache through explicit unload.
//!
//! **Used by**: `ResourceCache` (add/free on put/evict), `LoaderService` stats

use log::{debug, info};
use std::sync::atomic::{AtomicUsize, Ordering};
use sysinfo::System;

const GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Tracks bytes held by cached resources against a limit
#[derive(Debug)]
pub struct MemoryBudget {
    /// Atomically tracked memory usage (bytes)
    memory_usage: AtomicUsize,
    /// Maximum allowed memory (bytes)
    max_memory_bytes: usize,
}

impl MemoryBudget {
    /// Budget derived from currently available system memory
    ///
    /// # Arguments
    ///
    /// * `mem_fraction` - Fraction of available memory (0.0-1.0, e.g. 0.25 = 25%)
    /// * `reserve_gb` - Memory kept for the rest of the app (GB)
    pub fn from_system(mem_fraction: f64, reserve_gb: f64) -> Self {
        let limit = Self::system_limit(mem_fraction, reserve_gb);
        info!(
            "MemoryBudget init: limit={} MB ({}% of available, {} GB reserved)",
            limit / 1024 / 1024,
            (mem_fraction * 100.0) as u32,
            reserve_gb
        );
        Self::with_limit(limit)
    }

    /// Budget with an explicit byte limit
    pub fn with_limit(limit_bytes: usize) -> Self {
        Self {
            memory_usage: AtomicUsize::new(0),
            max_memory_bytes: limit_bytes,
        }
    }

    /// Effectively unbounded budget (tests, hosts that don't care)
    pub fn unlimited() -> Self {
        Self::with_limit(usize::MAX)
    }

    fn system_limit(mem_fraction: f64, reserve_gb: f64) -> usize {
        let mut sys = System::new();
        sys.refresh_memory();

        let available = sys.available_memory() as usize;
        let reserve = (reserve_gb.max(0.0) * GB) as usize;
        let usable = available.saturating_sub(reserve);
        (usable as f64 * mem_fraction.clamp(0.0, 1.0)) as usize
    }

    /// Check if memory limit exceeded
    pub fn is_over_limit(&self) -> bool {
        self.memory_usage.load(Ordering::Relaxed) > self.max_memory_bytes
    }

    /// Get memory statistics (usage, limit)
    pub fn mem(&self) -> (usize, usize) {
        let usage = self.memory_usage.load(Ordering::Relaxed);
        let limit = self.max_memory_bytes;
        (usage, limit)
    }

    /// Get memory usage fraction (0.0-1.0, can exceed 1.0 when over)
    pub fn usage_fraction(&self) -> f64 {
        let (usage, limit) = self.mem();
        if limit == 0 {
            0.0
        } else {
            usage as f64 / limit as f64
        }
    }

    /// Add memory usage
    pub fn add(&self, bytes: usize) {
        let new_usage = self.memory_usage.fetch_add(bytes, Ordering::Relaxed) + bytes;
        let limit = self.max_memory_bytes;
        if new_usage > limit {
            debug!(
                "Memory budget exceeded: {} MB / {} MB",
                new_usage / 1024 / 1024,
                limit / 1024 / 1024
            );
        }
    }

    /// Free memory usage (saturating, never underflows)
    pub fn free(&self, bytes: usize) {
        let _ = self
            .memory_usage
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_sub(bytes))
            });
    }
}

impl Default for MemoryBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}
