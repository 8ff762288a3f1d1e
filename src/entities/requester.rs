//! Requester capability record.
//!
//! Anything can ask the loader for a resource by handing over a
//! `Requester`: a delivery callback, an optional failure callback and the
//! per-requester `load_immediate` policy. No base type to inherit from.
//!
//! Identity: every `Requester::new` gets a fresh id; clones share it. The
//! queue uses the id to tell "same requester asked twice" apart from two
//! different requesters asking for the same key.

use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::LoadError;

type DeliverFn<R> = Arc<dyn Fn(Arc<R>) + Send + Sync>;
type FailureFn = Arc<dyn Fn(&LoadError) + Send + Sync>;

pub struct Requester<R> {
    id: Uuid,
    deliver: DeliverFn<R>,
    on_failure: Option<FailureFn>,
    load_immediate: bool,
}

impl<R> Requester<R> {
    /// Queued (throttled) requester with the given delivery callback.
    pub fn new<F>(deliver: F) -> Self
    where
        F: Fn(Arc<R>) + Send + Sync + 'static,
    {
        Self {
            id: Uuid::new_v4(),
            deliver: Arc::new(deliver),
            on_failure: None,
            load_immediate: false,
        }
    }

    /// Bypass the queue: decode as soon as the bytes arrive.
    pub fn immediate(mut self) -> Self {
        self.load_immediate = true;
        self
    }

    pub fn with_load_immediate(mut self, load_immediate: bool) -> Self {
        self.load_immediate = load_immediate;
        self
    }

    /// Get told about decode failures instead of silently never receiving
    /// a delivery.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(&LoadError) + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(f));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn load_immediate(&self) -> bool {
        self.load_immediate
    }

    pub fn deliver(&self, resource: Arc<R>) {
        (self.deliver)(resource);
    }

    /// Report a failure. No-op without a failure callback.
    pub fn fail(&self, err: &LoadError) {
        if let Some(cb) = &self.on_failure {
            cb(err);
        }
    }
}

impl<R> Clone for Requester<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            deliver: Arc::clone(&self.deliver),
            on_failure: self.on_failure.clone(),
            load_immediate: self.load_immediate,
        }
    }
}

impl<R> PartialEq for Requester<R> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<R> Eq for Requester<R> {}

impl<R> fmt::Debug for Requester<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requester")
            .field("id", &self.id)
            .field("load_immediate", &self.load_immediate)
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_clone_shares_identity() {
        let r: Requester<u32> = Requester::new(|_| {});
        let c = r.clone();
        assert_eq!(r, c);
        assert_eq!(r.id(), c.id());

        let other: Requester<u32> = Requester::new(|_| {});
        assert_ne!(r, other);
    }

    #[test]
    fn test_deliver_and_fail() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&delivered);
        let f = Arc::clone(&failed);

        let r = Requester::new(move |v: Arc<u32>| {
            d.fetch_add(*v as usize, Ordering::SeqCst);
        })
        .on_failure(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });

        r.deliver(Arc::new(7));
        r.fail(&LoadError::decode("k", "bad"));
        assert_eq!(delivered.load(Ordering::SeqCst), 7);
        assert_eq!(failed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fail_without_callback_is_noop() {
        let r: Requester<u32> = Requester::new(|_| {});
        r.fail(&LoadError::decode("k", "bad"));
        assert!(!r.load_immediate());
        assert!(r.clone().immediate().load_immediate());
    }
}
