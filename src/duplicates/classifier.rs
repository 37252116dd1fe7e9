//! Size classification and candidate emission.
//!
//! # Overview
//!
//! Files with a size no other file shares cannot be duplicates, so they are
//! never hashed. [`SizeClassifier`] keeps a scratch index of size → paths and
//! decides, one file at a time and without a second pass, which paths become
//! hashing candidates:
//!
//! | paths recorded for this size | emitted |
//! |---|---|
//! | 1 | nothing |
//! | 2 | the held first path and the new one |
//! | 3+ | only the new one |
//!
//! Each eligible path is therefore emitted exactly once, in O(1) amortized
//! work per file.
//!
//! # Example
//!
//! ```
//! use finddups::duplicates::{Emission, SizeClassifier};
//! use finddups::scanner::FileRecord;
//!
//! let mut classifier = SizeClassifier::new(0);
//! assert_eq!(classifier.classify(FileRecord::new("/a", 10)), Emission::Held);
//! assert!(matches!(
//!     classifier.classify(FileRecord::new("/b", 10)),
//!     Emission::Pair(_, _)
//! ));
//! assert!(matches!(
//!     classifier.classify(FileRecord::new("/c", 10)),
//!     Emission::Single(_)
//! ));
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::progress::ProgressCallback;
use crate::scanner::{FileRecord, ScanError};

/// Outcome of classifying one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    /// At or below the size threshold; not recorded.
    BelowThreshold,
    /// First file of its size; held back until a second one shows up.
    Held,
    /// Second file of its size: the held file and this one.
    Pair(FileRecord, FileRecord),
    /// Third or later file of its size.
    Single(FileRecord),
}

impl Emission {
    /// Number of candidates this emission carries.
    #[must_use]
    pub fn candidate_count(&self) -> usize {
        match self {
            Self::BelowThreshold | Self::Held => 0,
            Self::Single(_) => 1,
            Self::Pair(_, _) => 2,
        }
    }
}

/// Counters kept by the classifier while it runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifierStats {
    /// Regular files handed to the classifier
    pub files_seen: usize,
    /// Files strictly larger than the threshold
    pub eligible_files: usize,
    /// Candidates released by the emission rule
    pub candidates_released: usize,
    /// Released candidates that were accepted by the work queue
    pub candidates_emitted: usize,
    /// Distinct sizes among eligible files
    pub distinct_sizes: usize,
}

/// Everything the producer side reports once the walk is over.
#[derive(Debug, Default)]
pub struct ClassifierReport {
    /// Classification counters
    pub stats: ClassifierStats,
    /// Entries that could not be visited
    pub errors: Vec<ScanError>,
    /// Whether emission stopped because of a shutdown request
    pub interrupted: bool,
}

/// Single-owner size index deciding which files must be hashed.
pub struct SizeClassifier {
    min_size: u64,
    groups: HashMap<u64, Vec<PathBuf>>,
    stats: ClassifierStats,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for SizeClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SizeClassifier")
            .field("min_size", &self.min_size)
            .field("groups", &self.groups.len())
            .field("stats", &self.stats)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl SizeClassifier {
    /// Create a classifier. Only files strictly larger than `min_size`
    /// are considered.
    #[must_use]
    pub fn new(min_size: u64) -> Self {
        Self {
            min_size,
            groups: HashMap::new(),
            stats: ClassifierStats::default(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Set the shutdown flag checked before every emission.
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

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> &ClassifierStats {
        &self.stats
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Record one file and return the candidates it releases.
    pub fn classify(&mut self, record: FileRecord) -> Emission {
        self.stats.files_seen += 1;

        if record.size <= self.min_size {
            log::trace!(
                "Skipping file at or below threshold ({} bytes): {}",
                record.size,
                record.path.display()
            );
            return Emission::BelowThreshold;
        }
        self.stats.eligible_files += 1;

        let group = self.groups.entry(record.size).or_default();
        group.push(record.path.clone());

        let emission = match group.len() {
            1 => {
                self.stats.distinct_sizes += 1;
                Emission::Held
            }
            2 => {
                let first = FileRecord::new(group[0].clone(), record.size);
                log::debug!(
                    "Size {} now shared: {} and {}",
                    record.size,
                    first.path.display(),
                    record.path.display()
                );
                Emission::Pair(first, record)
            }
            _ => Emission::Single(record),
        };

        self.stats.candidates_released += emission.candidate_count();
        emission
    }

    /// Drive the classifier over `source`, pushing candidates onto `queue`.
    ///
    /// Consumes both the classifier and the sender: when this returns, the
    /// sender is dropped, which closes the candidate queue exactly once.
    /// Entry errors are collected and the walk continues. If the shutdown
    /// flag is raised, or every worker has gone away, emission stops early.
    pub fn run<I>(mut self, source: I, queue: Sender<FileRecord>) -> ClassifierReport
    where
        I: IntoIterator<Item = Result<FileRecord, ScanError>>,
    {
        let mut report = ClassifierReport::default();

        for item in source {
            if self.is_shutdown_requested() {
                log::debug!("Classifier: Shutdown requested, no further candidates");
                report.interrupted = true;
                break;
            }

            let record = match item {
                Ok(record) => record,
                Err(e) => {
                    report.errors.push(e);
                    continue;
                }
            };

            if let Some(ref callback) = self.progress_callback {
                callback.on_file_seen(&record.path);
            }

            let delivered = match self.classify(record) {
                Emission::BelowThreshold | Emission::Held => true,
                Emission::Pair(first, second) => {
                    self.emit(&queue, first) && self.emit(&queue, second)
                }
                Emission::Single(record) => self.emit(&queue, record),
            };

            if !delivered {
                log::error!("Candidate queue closed before the walk finished");
                break;
            }
        }

        log::debug!(
            "Classifier done: {} files seen, {} eligible, {} candidates across {} sizes",
            self.stats.files_seen,
            self.stats.eligible_files,
            self.stats.candidates_emitted,
            self.stats.distinct_sizes
        );

        report.stats = self.stats;
        report
    }

    fn emit(&mut self, queue: &Sender<FileRecord>, record: FileRecord) -> bool {
        if let Some(ref callback) = self.progress_callback {
            callback.on_candidate(&record);
        }
        let sent = queue.send(record).is_ok();
        if sent {
            self.stats.candidates_emitted += 1;
        }
        sent
    }
}
