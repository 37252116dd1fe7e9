//! Fixed-size hashing worker pool.
//!
//! # Overview
//!
//! [`WorkerPool`] runs N worker threads that drain a bounded candidate queue,
//! hash each file with the shared [`Hasher`], and push a [`HashedFile`] onto a
//! bounded result queue. Both queues block when full, so a slow stage
//! throttles the faster one.
//!
//! A read failure produces no result: the path is logged, counted, and left
//! out of every duplicate set.
//!
//! The result queue is closed by a [`FanIn`] barrier, and only after every
//! worker thread has exited, so a consumer draining [`WorkerPool::results`]
//! never misses a late result.
//!
//! # Example
//!
//! ```no_run
//! use finddups::duplicates::{PoolConfig, WorkerPool};
//! use finddups::scanner::{FileRecord, Hasher};
//! use std::sync::Arc;
//!
//! let mut pool = WorkerPool::start(PoolConfig::new(4), Arc::new(Hasher::new())).unwrap();
//! pool.submit(FileRecord::new("/tmp/a", 10)).unwrap();
//! pool.close();
//! for hashed in pool.results() {
//!     println!("{}", hashed.path.display());
//! }
//! let stats = pool.join();
//! println!("{} attempts", stats.hash_attempts);
//! ```

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, SendError, Sender};

use crate::progress::ProgressCallback;
use crate::scanner::{FileRecord, Hash, HashError, Hasher};

/// A successfully hashed candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedFile {
    /// BLAKE3 digest of the full content
    pub digest: Hash,
    /// Path that was hashed
    pub path: PathBuf,
    /// Size the file was classified under
    pub size: u64,
}

/// Pool sizing and hooks.
#[derive(Clone)]
pub struct PoolConfig {
    /// Number of worker threads (at least 1)
    pub workers: usize,
    /// Capacity of the candidate and result queues (at least 1)
    pub queue_capacity: usize,
    /// Optional shutdown flag; workers drain without hashing once raised.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolConfig")
            .field("workers", &self.workers)
            .field("queue_capacity", &self.queue_capacity)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl PoolConfig {
    /// `workers` threads with queues sized to match.
    #[must_use]
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            workers,
            queue_capacity: workers,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Override the queue capacity.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set the shutdown flag.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }
}

/// Per-worker counters, summed across the pool on join.
#[derive(Debug, Clone, Default)]
pub struct WorkerStats {
    /// Files a worker tried to hash
    pub hash_attempts: usize,
    /// Attempts that failed with a read error
    pub hash_failures: usize,
    /// Candidates drained without hashing after shutdown
    pub skipped: usize,
    /// Bytes of content hashed successfully
    pub bytes_hashed: u64,
    /// The read errors behind `hash_failures`
    pub errors: Vec<HashError>,
}

impl WorkerStats {
    /// Fold another worker's counters into these.
    pub fn merge(&mut self, other: WorkerStats) {
        self.hash_attempts += other.hash_attempts;
        self.hash_failures += other.hash_failures;
        self.skipped += other.skipped;
        self.bytes_hashed += other.bytes_hashed;
        self.errors.extend(other.errors);
    }
}

/// Closes a channel once every producer thread has exited.
///
/// The barrier owns the last sender handle that is not held by a producer.
/// A background thread joins each producer in turn and drops that handle only
/// after the final join, so the channel cannot disconnect while any producer
/// is still running.
#[derive(Debug)]
pub struct FanIn<S> {
    closer: JoinHandle<Vec<S>>,
}

impl<S: Send + 'static> FanIn<S> {
    /// Start watching `producers`; `sender` is dropped after the last exits.
    ///
    /// # Errors
    ///
    /// Returns an error if the closer thread cannot be spawned.
    pub fn spawn<T: Send + 'static>(
        producers: Vec<JoinHandle<S>>,
        sender: Sender<T>,
    ) -> io::Result<Self> {
        let closer = thread::Builder::new()
            .name("finddups-fan-in".to_string())
            .spawn(move || {
                let mut outputs = Vec::with_capacity(producers.len());
                for handle in producers {
                    match handle.join() {
                        Ok(output) => outputs.push(output),
                        Err(_) => log::error!("A worker thread panicked"),
                    }
                }
                drop(sender);
                outputs
            })?;
        Ok(Self { closer })
    }

    /// Wait for the barrier to release and collect each producer's output.
    pub fn wait(self) -> Vec<S> {
        self.closer.join().unwrap_or_else(|_| {
            log::error!("Fan-in thread panicked");
            Vec::new()
        })
    }
}

/// N hashing workers between a candidate queue and a result queue.
#[derive(Debug)]
pub struct WorkerPool {
    submitter: Option<Sender<FileRecord>>,
    results: Receiver<HashedFile>,
    fan_in: FanIn<WorkerStats>,
}

impl WorkerPool {
    /// Spawn the workers and the fan-in barrier.
    ///
    /// # Errors
    ///
    /// Returns an error if a thread cannot be spawned. Workers that did start
    /// exit on their own once the pool is dropped.
    pub fn start(config: PoolConfig, hasher: Arc<Hasher>) -> io::Result<Self> {
        let (submit_tx, submit_rx) = crossbeam_channel::bounded(config.queue_capacity);
        let (result_tx, result_rx) = crossbeam_channel::bounded(config.queue_capacity);

        let mut handles = Vec::with_capacity(config.workers);
        for id in 0..config.workers {
            let worker = Worker {
                id,
                input: submit_rx.clone(),
                output: result_tx.clone(),
                hasher: Arc::clone(&hasher),
                shutdown_flag: config.shutdown_flag.clone(),
                progress_callback: config.progress_callback.clone(),
            };
            let handle = thread::Builder::new()
                .name(format!("finddups-hash-{id}"))
                .spawn(move || worker.run())?;
            handles.push(handle);
        }

        log::debug!(
            "Started {} hashing workers (queue capacity {})",
            config.workers,
            config.queue_capacity
        );

        let fan_in = FanIn::spawn(handles, result_tx)?;

        Ok(Self {
            submitter: Some(submit_tx),
            results: result_rx,
            fan_in,
        })
    }

    /// Queue one candidate, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Fails if the pool was closed or every worker has exited.
    pub fn submit(&self, record: FileRecord) -> Result<(), SendError<FileRecord>> {
        match self.submitter {
            Some(ref tx) => tx.send(record),
            None => Err(SendError(record)),
        }
    }

    /// An extra handle onto the candidate queue for a producer thread.
    ///
    /// The queue stays open until the pool is closed and every handle
    /// returned here has been dropped.
    #[must_use]
    pub fn submitter(&self) -> Option<Sender<FileRecord>> {
        self.submitter.clone()
    }

    /// Release the pool's own handle onto the candidate queue.
    pub fn close(&mut self) {
        self.submitter = None;
    }

    /// Results as they arrive; ends once the result queue is closed.
    pub fn results(&self) -> crossbeam_channel::Iter<'_, HashedFile> {
        self.results.iter()
    }

    /// Close the pool, wait for every worker, and sum their counters.
    ///
    /// Results not yet consumed are discarded.
    pub fn join(mut self) -> WorkerStats {
        self.close();
        let Self { results, fan_in, .. } = self;

        // Keep the workers unblocked while they finish.
        let (outputs, discarded) = thread::scope(|scope| {
            let drain = scope.spawn(move || results.iter().count());
            let outputs = fan_in.wait();
            (outputs, drain.join().unwrap_or(0))
        });
        if discarded > 0 {
            log::debug!("Discarded {} unconsumed results", discarded);
        }

        outputs
            .into_iter()
            .fold(WorkerStats::default(), |mut acc, stats| {
                acc.merge(stats);
                acc
            })
    }
}

struct Worker {
    id: usize,
    input: Receiver<FileRecord>,
    output: Sender<HashedFile>,
    hasher: Arc<Hasher>,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl Worker {
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn run(self) -> WorkerStats {
        let mut stats = WorkerStats::default();

        for record in self.input.iter() {
            if self.is_shutdown_requested() {
                stats.skipped += 1;
                continue;
            }

            match self.hasher.full_hash(&record.path) {
                Ok(digest) => {
                    stats.hash_attempts += 1;
                    stats.bytes_hashed += record.size;
                    if let Some(ref callback) = self.progress_callback {
                        callback.on_hashed(&record.path, record.size);
                    }
                    let hashed = HashedFile {
                        digest,
                        path: record.path,
                        size: record.size,
                    };
                    if self.output.send(hashed).is_err() {
                        log::debug!("Worker {}: result queue closed, exiting", self.id);
                        break;
                    }
                }
                Err(HashError::Interrupted(_)) => {
                    stats.skipped += 1;
                }
                Err(e) => {
                    stats.hash_attempts += 1;
                    stats.hash_failures += 1;
                    log::warn!("Failed to hash {}", e);
                    stats.errors.push(e);
                }
            }
        }

        log::trace!(
            "Worker {} exiting after {} attempts",
            self.id,
            stats.hash_attempts
        );
        stats
    }
}
