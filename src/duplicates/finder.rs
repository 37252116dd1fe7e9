//! Pipeline coordinator.
//!
//! # Overview
//!
//! [`DuplicateFinder`] wires the stages together and owns their lifecycle:
//!
//! 1. A [`WorkerPool`] is started with a bounded candidate queue and a bounded
//!    result queue; its fan-in barrier closes the result queue after the last
//!    worker exits.
//! 2. A traversal thread walks the tree and drives a [`SizeClassifier`],
//!    which pushes candidates onto the pool and closes the candidate queue
//!    when the walk ends.
//! 3. The calling thread drains results into [`DigestGroups`] as they
//!    arrive, until the result queue closes.
//! 4. Singleton digests are dropped and the confirmed sets are returned with
//!    [`TraversalStats`].
//!
//! The size index and the digest index each have a single owner thread for
//! their whole lifetime; the two queues are the only shared structures.
//!
//! # Example
//!
//! ```no_run
//! use finddups::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::Path;
//!
//! let config = FinderConfig::default().with_workers(4).with_min_size(1024);
//! let finder = DuplicateFinder::new(config);
//!
//! let (sets, stats) = finder.find_duplicates(Path::new("/some/path")).unwrap();
//!
//! println!("Found {} duplicate sets", sets.len());
//! println!("Reclaimable space: {}", stats.reclaimable_display());
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use crossbeam_channel::Sender;

use super::classifier::{ClassifierReport, SizeClassifier};
use super::groups::{DigestGroups, DuplicateSet};
use super::pool::{PoolConfig, WorkerPool};
use crate::progress::ProgressCallback;
use crate::scanner::{
    FileRecord, HashError, Hasher, ScanError, Walker, WalkerConfig, DEFAULT_BUFFER_SIZE,
};

/// Number of hashing workers used when none is configured.
#[must_use]
pub fn default_workers() -> usize {
    thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Number of hashing workers.
    pub workers: usize,
    /// Only files strictly larger than this are considered.
    pub min_size: u64,
    /// Follow symbolic links during traversal.
    pub follow_symlinks: bool,
    /// Capacity of both pipeline queues; `None` uses the worker count.
    pub queue_capacity: Option<usize>,
    /// Extra attempts for reads that fail with a transient error.
    pub read_retries: u32,
    /// Read buffer size used while hashing.
    pub buffer_size: usize,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("workers", &self.workers)
            .field("min_size", &self.min_size)
            .field("follow_symlinks", &self.follow_symlinks)
            .field("queue_capacity", &self.queue_capacity)
            .field("read_retries", &self.read_retries)
            .field("buffer_size", &self.buffer_size)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            min_size: 0,
            follow_symlinks: false,
            queue_capacity: None,
            read_retries: 0,
            buffer_size: DEFAULT_BUFFER_SIZE,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the worker count. Zero selects the number of available CPUs.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = if workers == 0 {
            default_workers()
        } else {
            workers
        };
        self
    }

    /// Set the exclusive size threshold.
    #[must_use]
    pub fn with_min_size(mut self, min_size: u64) -> Self {
        self.min_size = min_size;
        self
    }

    /// Enable or disable following symbolic links.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set the capacity of the candidate and result queues.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity.max(1));
        self
    }

    /// Retry transient read errors up to `retries` more times.
    #[must_use]
    pub fn with_read_retries(mut self, retries: u32) -> Self {
        self.read_retries = retries;
        self
    }

    /// Set the hashing read buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set the shutdown flag for graceful termination.
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

    fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.workers).max(1)
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Counters describing one run of the pipeline.
///
/// Informational only; correctness never depends on them. Absent
/// cancellation, `hash_attempts == candidates_emitted`.
#[derive(Debug, Clone, Default)]
pub struct TraversalStats {
    /// Regular files visited
    pub files_seen: usize,
    /// Files strictly larger than the size threshold
    pub eligible_files: usize,
    /// Paths emitted for hashing
    pub candidates_emitted: usize,
    /// Candidates a worker tried to hash
    pub hash_attempts: usize,
    /// Attempts that ended in a read error
    pub hash_failures: usize,
    /// Candidates drained without hashing after cancellation
    pub hashes_skipped: usize,
    /// Content bytes hashed successfully
    pub bytes_hashed: u64,
    /// Entries skipped during the walk
    pub traversal_errors: Vec<ScanError>,
    /// Read errors behind `hash_failures`
    pub hash_errors: Vec<HashError>,
    /// Confirmed duplicate sets
    pub duplicate_sets: usize,
    /// Redundant copies across all sets (members beyond the first)
    pub duplicate_files: usize,
    /// Bytes freed by removing every redundant copy
    pub reclaimable_space: u64,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
    /// Whether the run was cut short by a shutdown request
    pub interrupted: bool,
}

impl TraversalStats {
    /// Eligible files never hashed because their size was unique.
    #[must_use]
    pub fn unique_size_files(&self) -> usize {
        self.eligible_files.saturating_sub(self.candidates_emitted)
    }

    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize::b(self.reclaimable_space).to_string()
    }

    /// Format hashed bytes as human-readable string.
    #[must_use]
    pub fn bytes_hashed_display(&self) -> String {
        ByteSize::b(self.bytes_hashed).to_string()
    }

    fn absorb_classifier(&mut self, report: ClassifierReport) {
        self.files_seen = report.stats.files_seen;
        self.eligible_files = report.stats.eligible_files;
        self.candidates_emitted = report.stats.candidates_emitted;
        self.traversal_errors = report.errors;
        self.interrupted |= report.interrupted;
    }

    fn absorb_results(&mut self, sets: &[DuplicateSet]) {
        self.duplicate_sets = sets.len();
        self.duplicate_files = sets.iter().map(DuplicateSet::duplicate_count).sum();
        self.reclaimable_space = sets.iter().map(DuplicateSet::wasted_space).sum();
    }
}

/// Errors that abort a whole run.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The root does not exist or cannot be stat'ed.
    #[error("Root not found: {path}: {source}")]
    RootNotFound {
        /// The root that was given
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The root exists but is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The root directory cannot be listed.
    #[error("Cannot read root directory {path}: {source}")]
    RootUnreadable {
        /// The root that was given
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A pipeline thread could not be started.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Duplicate finder that runs the classify → hash → aggregate pipeline.
#[derive(Debug)]
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Arc<Hasher>,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let mut hasher = Hasher::new()
            .with_buffer_size(config.buffer_size)
            .with_retries(config.read_retries);
        if let Some(ref flag) = config.shutdown_flag {
            hasher = hasher.with_shutdown_flag(Arc::clone(flag));
        }
        Self {
            config,
            hasher: Arc::new(hasher),
        }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Find every set of identical files under `root`.
    ///
    /// Entries that cannot be visited and files that cannot be read are
    /// skipped and reported in the returned [`TraversalStats`]; they never
    /// fail the run.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if:
    /// - The root does not exist, is not a directory, or cannot be listed
    /// - A pipeline thread cannot be spawned
    /// - The scan is interrupted by shutdown signal
    pub fn find_duplicates(
        &self,
        root: &Path,
    ) -> Result<(Vec<DuplicateSet>, TraversalStats), FinderError> {
        validate_root(root)?;

        log::info!("Starting duplicate scan of {}", root.display());

        let mut walker = Walker::new(root, WalkerConfig::new(self.config.follow_symlinks));
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }

        self.run_pipeline(move |classifier, queue| classifier.run(walker.walk(), queue))
    }

    /// Run the same pipeline over records listed by the caller.
    ///
    /// Each record's size is taken as given; the files are not stat'ed again
    /// before hashing.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if a pipeline thread cannot be spawned or the
    /// scan is interrupted by shutdown signal.
    pub fn find_duplicates_from_files<I>(
        &self,
        records: I,
    ) -> Result<(Vec<DuplicateSet>, TraversalStats), FinderError>
    where
        I: IntoIterator<Item = FileRecord> + Send,
    {
        log::info!("Starting duplicate scan of pre-listed files");
        self.run_pipeline(move |classifier, queue| {
            classifier.run(records.into_iter().map(Ok), queue)
        })
    }

    /// Start the pool, run `produce` on a traversal thread, and aggregate
    /// results on the calling thread until the result queue closes.
    fn run_pipeline<F>(
        &self,
        produce: F,
    ) -> Result<(Vec<DuplicateSet>, TraversalStats), FinderError>
    where
        F: FnOnce(SizeClassifier, Sender<FileRecord>) -> ClassifierReport + Send,
    {
        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let start_time = Instant::now();
        let mut stats = TraversalStats::default();

        let mut pool_config = PoolConfig::new(self.config.workers)
            .with_queue_capacity(self.config.effective_queue_capacity());
        let mut classifier = SizeClassifier::new(self.config.min_size);
        if let Some(ref flag) = self.config.shutdown_flag {
            pool_config = pool_config.with_shutdown_flag(Arc::clone(flag));
            classifier = classifier.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(ref callback) = self.config.progress_callback {
            pool_config = pool_config.with_progress_callback(Arc::clone(callback));
            classifier = classifier.with_progress_callback(Arc::clone(callback));
        }

        let mut pool = WorkerPool::start(pool_config, Arc::clone(&self.hasher))?;
        let submitter = pool
            .submitter()
            .ok_or_else(|| io::Error::other("worker pool closed before start"))?;
        // The traversal thread holds the only handle from here on.
        pool.close();

        let mut groups = DigestGroups::new();
        let report = thread::scope(|scope| -> io::Result<ClassifierReport> {
            let producer = thread::Builder::new()
                .name("finddups-walk".to_string())
                .spawn_scoped(scope, move || produce(classifier, submitter))?;

            groups.extend(pool.results());

            Ok(producer
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload)))
        })?;

        let worker_stats = pool.join();

        stats.absorb_classifier(report);
        stats.hash_attempts = worker_stats.hash_attempts;
        stats.hash_failures = worker_stats.hash_failures;
        stats.hashes_skipped = worker_stats.skipped;
        stats.bytes_hashed = worker_stats.bytes_hashed;
        stats.hash_errors = worker_stats.errors;

        log::info!(
            "Walk complete: {} files seen, {} eligible, {} candidates ({} unique sizes skipped)",
            stats.files_seen,
            stats.eligible_files,
            stats.candidates_emitted,
            stats.unique_size_files()
        );
        log::info!(
            "Hashing complete: {} attempts, {} failures, {} hashed",
            stats.hash_attempts,
            stats.hash_failures,
            stats.bytes_hashed_display()
        );

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_finish();
        }

        if stats.interrupted || self.config.is_shutdown_requested() {
            log::info!(
                "Scan interrupted after {} of {} candidates",
                stats.hash_attempts,
                stats.candidates_emitted
            );
            return Err(FinderError::Interrupted);
        }

        let sets = groups.into_duplicates();
        stats.absorb_results(&sets);
        stats.elapsed = start_time.elapsed();

        Ok((sets, stats))
    }
}

/// Reject roots that cannot be traversed at all.
fn validate_root(root: &Path) -> Result<(), FinderError> {
    let metadata = fs::metadata(root).map_err(|source| FinderError::RootNotFound {
        path: root.to_path_buf(),
        source,
    })?;

    if !metadata.is_dir() {
        return Err(FinderError::NotADirectory(root.to_path_buf()));
    }

    fs::read_dir(root).map_err(|source| FinderError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    Ok(())
}
