//! Background thread pool for fetch jobs
//!
//! Uses work-stealing deques:
//! - External jobs land in a global injector
//! - Idle workers steal from each other
//!
//! Fetches are the only blocking step of a request (disk, bundle, network),
//! so they run here while the owner thread keeps ticking.

use crossbeam::deque::{Injector, Stealer, Worker};
use log::{trace, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::entities::WorkerPool;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Worker pool with work-stealing.
///
/// # Example
/// ```ignore
/// let workers = Workers::new(2);
/// workers.execute(Box::new(move || {
///     let bytes = fetcher.fetch(&key);
///     tx.send((ticket, bytes)).ok();
/// }));
/// ```
pub struct Workers {
    injector: Arc<Injector<Job>>,         // Global queue for external jobs
    handles: Vec<thread::JoinHandle<()>>, // Thread handles for proper shutdown
    shutdown: Arc<AtomicBool>,            // Shutdown signal
}

impl Workers {
    /// Create worker pool.
    ///
    /// Recommended: `num_cpus::get() * 3 / 4` (leave room for the host's main thread).
    pub fn new(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        let injector: Arc<Injector<Job>> = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let workers_local: Vec<Worker<Job>> = (0..num_threads).map(|_| Worker::new_fifo()).collect();
        let stealers: Vec<Stealer<Job>> = workers_local.iter().map(|w| w.stealer()).collect();
        let mut handles = Vec::with_capacity(num_threads);

        for (worker_id, worker) in workers_local.into_iter().enumerate() {
            let injector = Arc::clone(&injector);
            let shutdown = Arc::clone(&shutdown);
            let stealers = stealers.clone();

            let spawned = thread::Builder::new()
                .name(format!("trickle-worker-{}", worker_id))
                .spawn(move || Self::run(worker_id, worker, &injector, &stealers, &shutdown));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => warn!("Failed to spawn worker {}: {}", worker_id, e),
            }
        }

        trace!("Workers initialized: {} threads (work-stealing)", handles.len());

        Self {
            injector,
            handles,
            shutdown,
        }
    }

    /// Pool sized for the current machine
    pub fn with_default_threads() -> Self {
        Self::new(default_threads())
    }

    fn run(
        worker_id: usize,
        worker: Worker<Job>,
        injector: &Injector<Job>,
        stealers: &[Stealer<Job>],
        shutdown: &AtomicBool,
    ) {
        trace!("Worker {} started", worker_id);

        loop {
            // 1. Own queue first
            if let Some(job) = worker.pop() {
                job();
                continue;
            }

            // 2. Global injector (batch into own queue)
            if let Some(job) = injector.steal_batch_and_pop(&worker).success() {
                job();
                continue;
            }

            // 3. Steal from other workers
            if let Some(job) = stealers.iter().find_map(|s| s.steal().success()) {
                job();
                continue;
            }

            // 4. Check shutdown (only once everything queued has run)
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            // 5. No work - short sleep to avoid CPU spin
            thread::sleep(Duration::from_millis(1));
        }

        trace!("Worker {} stopped", worker_id);
    }

    /// Number of live worker threads
    pub fn threads(&self) -> usize {
        self.handles.len()
    }

    /// Execute closure on a worker thread.
    ///
    /// Runs asynchronously, no return value: report back through a channel.
    /// With no live threads the job runs inline so it can't be lost.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.handles.is_empty() {
            f();
            return;
        }
        self.injector.push(Box::new(f));
    }
}

/// `num_cpus::get() * 3 / 4`, at least one
pub fn default_threads() -> usize {
    (num_cpus::get() * 3 / 4).max(1)
}

impl Drop for Workers {
    fn drop(&mut self) {
        let num_threads = self.handles.len();
        trace!("Workers shutting down ({} threads)...", num_threads);

        // Signal all workers to stop
        self.shutdown.store(true, Ordering::SeqCst);

        // Wait with timeout (500ms total for all threads). A fetch stuck on
        // I/O must not hang the host's exit.
        let deadline = Instant::now() + Duration::from_millis(500);

        for handle in std::mem::take(&mut self.handles) {
            while !handle.is_finished() {
                if Instant::now() >= deadline {
                    trace!("Shutdown timeout reached, exiting anyway");
                    return;
                }
                thread::sleep(Duration::from_millis(1));
            }
            let _ = handle.join();
        }

        trace!("All {} workers stopped gracefully", num_threads);
    }
}

// ============================================================================
// WorkerPool Trait Implementation
// ============================================================================

impl WorkerPool for Workers {
    fn execute(&self, job: Box<dyn FnOnce() + Send + 'static>) {
        Workers::execute(self, job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_jobs_run_on_worker_threads() {
        let workers = Workers::new(2);
        assert_eq!(workers.threads(), 2);

        let (tx, rx) = crossbeam_channel::unbounded();
        for i in 0..10 {
            let tx = tx.clone();
            workers.execute(move || {
                let name = thread::current().name().unwrap_or_default().to_string();
                tx.send((i, name)).unwrap();
            });
        }

        let mut seen: Vec<(i32, String)> = (0..10)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        seen.sort();
        assert_eq!(seen.len(), 10);
        assert!(seen.iter().all(|(_, name)| name.starts_with("trickle-worker-")));
    }

    #[test]
    fn test_drop_runs_queued_jobs_first() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let workers = Workers::new(1);
            for _ in 0..5 {
                let c = Arc::clone(&counter);
                workers.execute(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                });
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_default_threads_nonzero() {
        assert!(default_threads() >= 1);
    }
}
