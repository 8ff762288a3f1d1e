//! Core engine modules - cache, queue, service, workers
//!
//! These modules form the loading engine, independent of any host loop.

pub mod budget;
pub mod load_queue;
pub mod loader;
pub mod resource_cache;
pub mod workers;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use budget::MemoryBudget;
pub use load_queue::{DelayPolicy, DrainStep, LoadQueue, QueueItem};
pub use loader::{LoaderService, LoaderStats, RequestOutcome};
pub use resource_cache::{CacheStats, ResourceCache};
pub use workers::Workers;
