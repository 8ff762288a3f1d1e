//! Entities module - the loader's collaborators and data types
//!
//! - `traits`: seams the core calls into (Decoder, Fetcher, WorkerPool, Resource)
//! - `requester`: who asked, how to deliver, which load path
//! - `texture` / `decoder`: stock image resource and its decoder
//! - `fetcher`: stock byte sources (file system, in-memory)

pub mod decoder;
pub mod fetcher;
pub mod requester;
pub mod texture;
pub mod traits;

pub use decoder::ImageDecoder;
pub use fetcher::{FileFetcher, MemoryFetcher};
pub use requester::Requester;
pub use texture::{FilterMode, PixelFormat, Texture};
pub use traits::{Decoder, Fetcher, InlinePool, Resource, WorkerPool};
