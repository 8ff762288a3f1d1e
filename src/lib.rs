//! TRICKLE - throttled, de-duplicating resource loader
//!
//! Decodes each resource at most once, hands it to every requester and
//! spaces decode work out over frames so constrained devices don't spike.
//!
//! ```ignore
//! let service = LoaderService::new(
//!     DelayPolicy::FrameBoundary,
//!     Arc::new(MemoryBudget::unlimited()),
//!     ImageDecoder::default(),
//!     FileFetcher::new("assets"),
//!     Workers::new(2),
//! );
//! service.request("card_ace", Requester::new(|tex: Arc<Texture>| upload(&tex)));
//!
//! // once per frame:
//! service.tick();
//! ```

// Core engine (cache, queue, service, workers)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod entities;
pub mod error;
pub mod paths;

// Re-export commonly used types from core
pub use crate::core::budget::MemoryBudget;
pub use crate::core::load_queue::{DelayPolicy, DrainStep};
pub use crate::core::loader::{LoaderService, LoaderStats, RequestOutcome};
pub use crate::core::resource_cache::ResourceCache;
pub use crate::core::workers::Workers;

// Re-export entities
pub use config::LoaderConfig;
pub use entities::{
    Decoder, Fetcher, FileFetcher, FilterMode, ImageDecoder, InlinePool, MemoryFetcher, PixelFormat,
    Requester, Resource, Texture, WorkerPool,
};
pub use error::{CacheError, LoadError};
