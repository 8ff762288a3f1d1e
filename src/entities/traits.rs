//! Abstract traits for dependency inversion.
//!
//! These traits define the collaborators the loader core calls into
//! (decoding, fetching, background execution) without knowing the concrete
//! implementations. Stock implementations live next to this module
//! (`decoder`, `fetcher`) and in `core::workers`.

use std::sync::Arc;

use crate::error::LoadError;

/// Decoded, ready-to-use artifact held by the cache.
pub trait Resource {
    /// Approximate bytes held by this resource (memory accounting).
    fn mem(&self) -> usize;
}

/// Turns raw bytes into a resource. Selected per build/platform.
///
/// The bytes are consumed: the decode step owns them once a queue item is
/// dequeued.
pub trait Decoder<R>: Send + Sync {
    fn decode(&self, key: &str, bytes: Vec<u8>) -> Result<R, LoadError>;
}

/// Produces raw bytes for a key (file system, bundle, network...).
///
/// Called on a worker thread, never on the thread that owns the cache.
/// Blocking inside `fetch` is fine.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, key: &str) -> Result<Vec<u8>, LoadError>;
}

/// Abstract worker pool interface.
///
/// Allows the service to schedule fetches without knowing
/// the concrete thread pool implementation.
pub trait WorkerPool: Send + Sync {
    /// Run the job at some later point, possibly on another thread.
    fn execute(&self, job: Box<dyn FnOnce() + Send + 'static>);
}

/// Runs every job on the calling thread before returning.
///
/// For hosts without threads and for deterministic tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlinePool;

impl WorkerPool for InlinePool {
    fn execute(&self, job: Box<dyn FnOnce() + Send + 'static>) {
        job();
    }
}

/// Blanket impl: Arc<T> implements traits if T does
impl<R, T: Decoder<R> + ?Sized> Decoder<R> for Arc<T> {
    fn decode(&self, key: &str, bytes: Vec<u8>) -> Result<R, LoadError> {
        (**self).decode(key, bytes)
    }
}

impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    fn fetch(&self, key: &str) -> Result<Vec<u8>, LoadError> {
        (**self).fetch(key)
    }
}

impl<T: WorkerPool + ?Sized> WorkerPool for Arc<T> {
    fn execute(&self, job: Box<dyn FnOnce() + Send + 'static>) {
        (**self).execute(job)
    }
}
