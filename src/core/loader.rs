//! Loader service: the public entry point.
//!
//! Request lifecycle:
//! ```text
//! request ─┬─ cache hit ──────────────────────────────► deliver (synchronous)
//!          └─ miss ─► fetch on worker pool ─► channel ─► tick()
//!                                                        ├─ failed / empty ─► dropped (logged)
//!                                                        ├─ immediate ─► decode ─► put ─► deliver
//!                                                        └─ queued ─► LoadQueue ─► drain_step ─► deliver
//! ```
//!
//! The service is owned explicitly and shared by `Arc` handle. All cache and
//! queue mutation happens inside `tick()` on the owner's thread; worker
//! threads only fetch bytes and post them back over a channel.
//!
//! Delivery timing: a cache hit is delivered before `request` returns. Every
//! other delivery happens during a later `tick()`.

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, trace, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::budget::MemoryBudget;
use super::load_queue::{self, DelayPolicy, DrainStep, LoadQueue};
use super::resource_cache::{CacheStats, ResourceCache};
use crate::entities::{Decoder, Fetcher, Requester, Resource, WorkerPool};
use crate::error::LoadError;

/// What `request` did with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Empty key; nothing happens
    Invalid,
    /// Served from cache, already delivered
    Delivered,
    /// Fetch dispatched
    Fetching,
    /// Joined a fetch already in flight for the key
    Joined,
}

/// Point-in-time service statistics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoaderStats {
    pub hits: u64,
    pub misses: u64,
    pub cached: usize,
    pub mem_usage: usize,
    pub mem_limit: usize,
    pub over_budget: bool,
    pub queued: usize,
    pub in_flight: usize,
    pub draining: bool,
}

impl LoaderStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

/// Fetch result posted back by a worker
#[derive(Debug)]
struct FetchDone {
    key: String,
    result: Result<Vec<u8>, LoadError>,
}

/// Resets the ticking flag, even if a callback panics
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Cache + throttled queue + fetch dispatch
pub struct LoaderService<R> {
    cache: ResourceCache<R>,
    queue: LoadQueue<R>,
    decoder: Arc<dyn Decoder<R>>,
    fetcher: Arc<dyn Fetcher>,
    pool: Arc<dyn WorkerPool>,
    /// Requesters waiting on a fetch, by key, in arrival order
    in_flight: Mutex<HashMap<String, Vec<Requester<R>>>>,
    done_tx: Sender<FetchDone>,
    done_rx: Receiver<FetchDone>,
    /// A `tick()` is running (completions or drain step)
    ticking: AtomicBool,
}

impl<R: Resource + 'static> LoaderService<R> {
    pub fn new(
        delay: DelayPolicy,
        budget: Arc<MemoryBudget>,
        decoder: impl Decoder<R> + 'static,
        fetcher: impl Fetcher + 'static,
        pool: impl WorkerPool + 'static,
    ) -> Self {
        let (done_tx, done_rx) = unbounded();
        debug!("LoaderService created: delay={:?}", delay);

        Self {
            cache: ResourceCache::new(budget),
            queue: LoadQueue::new(delay),
            decoder: Arc::new(decoder),
            fetcher: Arc::new(fetcher),
            pool: Arc::new(pool),
            in_flight: Mutex::new(HashMap::new()),
            done_tx,
            done_rx,
            ticking: AtomicBool::new(false),
        }
    }

    /// Ask for a resource.
    ///
    /// Cache hit: `deliver` runs before this returns. Otherwise the bytes are
    /// fetched in the background and the request continues in `tick()`.
    /// An empty key is ignored.
    pub fn request(&self, key: &str, requester: Requester<R>) -> RequestOutcome {
        if key.is_empty() {
            debug!("Ignoring request with empty key");
            return RequestOutcome::Invalid;
        }

        let stats = self.cache.stats();
        if let Some(resource) = self.cache.try_get(key) {
            stats.record_hit();
            trace!("Cache hit '{}' for {}", key, requester.id());
            requester.deliver(resource);
            return RequestOutcome::Delivered;
        }
        stats.record_miss();

        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(waiters) = in_flight.get_mut(key) {
                trace!("'{}' already fetching, {} joins", key, requester.id());
                waiters.push(requester);
                return RequestOutcome::Joined;
            }
            in_flight.insert(key.to_string(), vec![requester]);
        } // released before dispatch: an inline pool runs the fetch right here

        debug!("Fetching '{}'", key);
        let fetcher = Arc::clone(&self.fetcher);
        let done_tx = self.done_tx.clone();
        let key = key.to_string();
        self.pool.execute(Box::new(move || {
            let result = fetcher.fetch(&key);
            // Receiver gone means the service was dropped; nothing to report to
            let _ = done_tx.send(FetchDone { key, result });
        }));

        RequestOutcome::Fetching
    }

    /// Evict a resource for everyone. The requester is not consulted:
    /// eviction is global.
    pub fn unload(&self, key: &str, requester: &Requester<R>) -> bool {
        if key.is_empty() {
            debug!("Ignoring unload with empty key");
            return false;
        }
        trace!("Unload '{}' by {}", key, requester.id());
        self.cache.evict(key)
    }

    /// One owner-side step; call once per host frame.
    ///
    /// Handles every fetch that completed since the last tick, then advances
    /// the drain by at most one item. A nested call (from inside a callback)
    /// returns `DrainStep::Busy` and does nothing.
    pub fn tick(&self) -> DrainStep {
        if self.ticking.swap(true, Ordering::Acquire) {
            trace!("tick: already ticking");
            return DrainStep::Busy;
        }
        let _guard = TickGuard(&self.ticking);

        while let Ok(done) = self.done_rx.try_recv() {
            self.complete_fetch(done);
        }
        self.queue.drain_step(&self.cache, self.decoder.as_ref())
    }

    fn complete_fetch(&self, done: FetchDone) {
        let FetchDone { key, result } = done;
        let waiters = self
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&key)
            .unwrap_or_default();

        let bytes = match result {
            Ok(bytes) if bytes.is_empty() => {
                warn!("Empty payload for '{}', dropping {} request(s)", key, waiters.len());
                return;
            }
            Ok(bytes) => bytes,
            Err(e) => {
                // Fetcher already logged the cause
                debug!("Fetch failed for '{}', dropping {} request(s): {}", key, waiters.len(), e);
                return;
            }
        };

        trace!("Fetched '{}' ({} bytes) for {} request(s)", key, bytes.len(), waiters.len());
        let last = waiters.len().saturating_sub(1);
        let mut bytes = Some(bytes);
        for (i, requester) in waiters.into_iter().enumerate() {
            let payload = if i == last {
                bytes.take().unwrap_or_default()
            } else {
                bytes.clone().unwrap_or_default()
            };

            if requester.load_immediate() {
                // Immediate requesters skip the queue
                let _ = load_queue::resolve(&self.cache, self.decoder.as_ref(), &key, payload, &requester);
            } else {
                self.queue.enqueue(&key, payload, requester);
            }
        }
    }

    /// Nothing in flight, nothing queued, no drain running
    pub fn is_idle(&self) -> bool {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
            && self.done_rx.is_empty()
            && self.queue.is_empty()
            && !self.queue.is_active()
    }

    /// Tick every `frame` until idle. Returns false on timeout.
    ///
    /// For hosts without their own frame loop (CLI, tests).
    pub fn run_until_idle(&self, frame: Duration, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.tick();
            if self.is_idle() {
                return true;
            }
            if Instant::now() >= deadline {
                warn!("run_until_idle: timed out after {:?}", timeout);
                return false;
            }
            std::thread::sleep(frame);
        }
    }

    pub fn cache(&self) -> &ResourceCache<R> {
        &self.cache
    }

    pub fn cache_stats(&self) -> Arc<CacheStats> {
        self.cache.stats()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_draining(&self) -> bool {
        self.queue.is_active()
    }

    /// True if this requester has an item waiting in the queue
    pub fn is_queued(&self, requester: &Requester<R>) -> bool {
        self.queue.has_requester(requester.id())
    }

    /// Keys with a fetch in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn delay(&self) -> DelayPolicy {
        self.queue.delay()
    }

    pub fn stats(&self) -> LoaderStats {
        let cache_stats = self.cache.stats();
        let (mem_usage, mem_limit) = self.cache.budget().mem();
        LoaderStats {
            hits: cache_stats.hits(),
            misses: cache_stats.misses(),
            cached: self.cache.len(),
            mem_usage,
            mem_limit,
            over_budget: self.cache.budget().is_over_limit(),
            queued: self.queue.len(),
            in_flight: self.in_flight(),
            draining: self.queue.is_active(),
        }
    }
}
