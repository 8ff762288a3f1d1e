//! Throttled decode queue with a single-flight drain.
//!
//! Pending work is `(key, bytes, requester)`. Items are kept in an
//! `IndexMap` keyed by the full triple, so insertion order is the delivery
//! order and an identical item can't be queued twice.
//!
//! The drain is a step function instead of a long-running task:
//! 1. `enqueue` activates the drain (due immediately) but never decodes
//! 2. The owner calls `drain_step` once per frame
//! 3. A due step pops the head, decodes (or reuses a cached resource),
//!    delivers, then schedules the next step one `DelayPolicy` interval
//!    after it finished
//! 4. A due step that finds the queue empty deactivates the drain
//!
//! Only one step can be in progress at a time: re-entrant or concurrent
//! calls return `DrainStep::Busy` without touching the queue.

use indexmap::IndexMap;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::resource_cache::ResourceCache;
use crate::entities::{Decoder, Requester, Resource};
use crate::error::LoadError;

/// Pause between two drain steps
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DelayPolicy {
    /// One item per `tick`, i.e. per host frame
    #[default]
    FrameBoundary,
    /// At least this many seconds between items
    FixedSeconds(f32),
}

impl DelayPolicy {
    /// Wait after an item. Negative or non-finite seconds count as zero.
    pub fn interval(&self) -> Duration {
        match *self {
            DelayPolicy::FrameBoundary => Duration::ZERO,
            DelayPolicy::FixedSeconds(s) if s.is_finite() && s > 0.0 => Duration::from_secs_f32(s),
            DelayPolicy::FixedSeconds(_) => Duration::ZERO,
        }
    }
}

/// Identity of a queued item: all three parts must match for a duplicate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ItemId {
    key: String,
    bytes: Vec<u8>,
    requester: Uuid,
}

/// Work item handed to the drain
#[derive(Debug)]
pub struct QueueItem<R> {
    pub key: String,
    pub bytes: Vec<u8>,
    pub requester: Requester<R>,
}

/// Outcome of one `drain_step` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainStep {
    /// No active drain
    Idle,
    /// Drain active, delay not elapsed yet
    Waiting,
    /// Another step is running (re-entrant or concurrent call)
    Busy,
    /// Head item delivered
    Delivered(String),
    /// Head item failed to decode; requester was told via `fail`
    Failed(String),
    /// Queue was empty, drain deactivated
    Finished,
}

#[derive(Debug)]
struct QueueState<R> {
    items: IndexMap<ItemId, Requester<R>>,
    /// A drain exists (possibly waiting out its delay)
    active: bool,
    /// A step is decoding/delivering right now
    busy: bool,
    due: Instant,
}

/// Ordered, de-duplicated backlog plus its drain
#[derive(Debug)]
pub struct LoadQueue<R> {
    state: Mutex<QueueState<R>>,
    delay: DelayPolicy,
}

/// Clears `busy` even if a callback panics mid-step, and schedules the next
/// step one delay interval after this one ends.
struct BusyGuard<'a, R> {
    state: &'a Mutex<QueueState<R>>,
    /// Step time as seen by the caller
    now: Instant,
    /// Wall clock at step start, to measure decode + deliver
    started: Instant,
    delay: Duration,
}

impl<R> Drop for BusyGuard<'_, R> {
    fn drop(&mut self) {
        let finished = self.now + self.started.elapsed();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.busy = false;
        state.due = finished + self.delay;
    }
}

impl<R: Resource> LoadQueue<R> {
    pub fn new(delay: DelayPolicy) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: IndexMap::new(),
                active: false,
                busy: false,
                due: Instant::now(),
            }),
            delay,
        }
    }

    pub fn delay(&self) -> DelayPolicy {
        self.delay
    }

    /// Append work to the tail.
    ///
    /// Returns false (and queues nothing) for an empty payload or when an
    /// identical item is already waiting. Activates the drain if none is
    /// active; never decodes on the caller's stack.
    pub fn enqueue(&self, key: &str, bytes: Vec<u8>, requester: Requester<R>) -> bool {
        if bytes.is_empty() {
            warn!("LoadQueue: dropping empty payload for '{}'", key);
            return false;
        }

        let id = ItemId {
            key: key.to_string(),
            bytes,
            requester: requester.id(),
        };

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.items.contains_key(&id) {
            trace!("LoadQueue: '{}' already queued for {}", key, id.requester);
            return false;
        }
        state.items.insert(id, requester);

        if !state.active {
            state.active = true;
            state.due = Instant::now();
            debug!("LoadQueue: drain started for '{}'", key);
        }
        trace!("LoadQueue: queued '{}' ({} pending)", key, state.items.len());
        true
    }

    /// Advance the drain by at most one item, using the current time.
    pub fn drain_step(&self, cache: &ResourceCache<R>, decoder: &dyn Decoder<R>) -> DrainStep {
        self.drain_step_at(Instant::now(), cache, decoder)
    }

    /// Advance the drain by at most one item as of `now`.
    ///
    /// The next step is due `delay` after this one finishes, so a slow
    /// decode never eats into the pause.
    pub fn drain_step_at(
        &self,
        now: Instant,
        cache: &ResourceCache<R>,
        decoder: &dyn Decoder<R>,
    ) -> DrainStep {
        let item = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.busy {
                return DrainStep::Busy;
            }
            if !state.active {
                return DrainStep::Idle;
            }
            if now < state.due {
                return DrainStep::Waiting;
            }

            match state.items.shift_remove_index(0) {
                Some((id, requester)) => {
                    state.busy = true;
                    QueueItem { key: id.key, bytes: id.bytes, requester }
                }
                None => {
                    state.active = false;
                    debug!("LoadQueue: drain finished");
                    return DrainStep::Finished;
                }
            }
        }; // lock released: decode and deliver may re-enter

        let key = item.key.clone();
        let _guard = BusyGuard {
            state: &self.state,
            now,
            started: Instant::now(),
            delay: self.delay.interval(),
        };

        match resolve(cache, decoder, &item.key, item.bytes, &item.requester) {
            Ok(()) => DrainStep::Delivered(key),
            Err(_) => DrainStep::Failed(key),
        }
    }

    /// Number of items waiting
    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True while a drain exists (including its trailing delay)
    pub fn is_active(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).active
    }

    /// True if any waiting item belongs to this requester
    pub fn has_requester(&self, requester: Uuid) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.items.keys().any(|id| id.requester == requester)
    }

    /// Waiting keys in delivery order
    pub fn pending_keys(&self) -> Vec<String> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.items.keys().map(|id| id.key.clone()).collect()
    }
}

/// Cache-or-decode, store, deliver. Shared by the drain and the immediate path.
///
/// A key that is already cached is delivered without decoding. A decode
/// failure is logged, reported through `Requester::fail` and leaves the
/// cache untouched.
pub(crate) fn resolve<R: Resource>(
    cache: &ResourceCache<R>,
    decoder: &dyn Decoder<R>,
    key: &str,
    bytes: Vec<u8>,
    requester: &Requester<R>,
) -> Result<(), LoadError> {
    let resource = match cache.try_get(key) {
        Some(existing) => {
            trace!("'{}' already cached, skipping decode", key);
            drop(bytes);
            existing
        }
        None => match decoder.decode(key, bytes) {
            Ok(decoded) => cache.put_or_get(key, decoded).0,
            Err(e) => {
                warn!("Decode failed for '{}': {}", key, e);
                requester.fail(&e);
                return Err(e);
            }
        },
    };

    requester.deliver(resource);
    Ok(())
}
