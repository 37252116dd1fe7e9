//! JSON output formatter for duplicate scan results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "hash": "abc123...",
//!       "size": 1024,
//!       "files": ["/path/to/file1.txt", "/path/to/file2.txt"]
//!     }
//!   ],
//!   "summary": {
//!     "files_seen": 100,
//!     "eligible_files": 90,
//!     "candidates": 12,
//!     "hash_attempts": 12,
//!     "hash_failures": 0,
//!     "traversal_errors": 0,
//!     "bytes_hashed": 123456,
//!     "duplicate_sets": 5,
//!     "duplicate_files": 7,
//!     "reclaimable_space": 51200,
//!     "elapsed_ms": 1234,
//!     "exit_code": 0,
//!     "exit_code_name": "FD000"
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use super::sorted_for_display;
use crate::duplicates::{DuplicateSet, TraversalStats};
use crate::error::ExitCode;

/// A single duplicate set in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateSet {
    /// BLAKE3 hash as hexadecimal string (64 characters)
    pub hash: String,
    /// File size in bytes
    pub size: u64,
    /// Paths of every member
    pub files: Vec<String>,
}

impl From<&DuplicateSet> for JsonDuplicateSet {
    fn from(set: &DuplicateSet) -> Self {
        Self {
            hash: set.digest_hex(),
            size: set.size,
            files: set
                .paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Regular files visited
    pub files_seen: usize,
    /// Files above the size threshold
    pub eligible_files: usize,
    /// Files sent for hashing
    pub candidates: usize,
    /// Hashes attempted
    pub hash_attempts: usize,
    /// Hashes that failed with a read error
    pub hash_failures: usize,
    /// Entries skipped during the walk
    pub traversal_errors: usize,
    /// Content bytes hashed
    pub bytes_hashed: u64,
    /// Confirmed duplicate sets
    pub duplicate_sets: usize,
    /// Redundant copies across all sets
    pub duplicate_files: usize,
    /// Bytes freed by removing the redundant copies
    pub reclaimable_space: u64,
    /// Wall-clock duration in milliseconds
    pub elapsed_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "FD000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from run statistics and an exit code.
    #[must_use]
    pub fn new(stats: &TraversalStats, exit_code: ExitCode) -> Self {
        Self {
            files_seen: stats.files_seen,
            eligible_files: stats.eligible_files,
            candidates: stats.candidates_emitted,
            hash_attempts: stats.hash_attempts,
            hash_failures: stats.hash_failures,
            traversal_errors: stats.traversal_errors.len(),
            bytes_hashed: stats.bytes_hashed,
            duplicate_sets: stats.duplicate_sets,
            duplicate_files: stats.duplicate_files,
            reclaimable_space: stats.reclaimable_space,
            elapsed_ms: u64::try_from(stats.elapsed.as_millis()).unwrap_or(u64::MAX),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Duplicate sets, in display order
    pub duplicates: Vec<JsonDuplicateSet>,
    /// Run statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output from duplicate sets, statistics and exit code.
    ///
    /// # Example
    ///
    /// ```
    /// use finddups::duplicates::{DuplicateSet, TraversalStats};
    /// use finddups::error::ExitCode;
    /// use finddups::output::JsonOutput;
    /// use std::path::PathBuf;
    ///
    /// let sets = vec![DuplicateSet {
    ///     digest: [0u8; 32],
    ///     size: 1024,
    ///     paths: vec![PathBuf::from("/file1.txt"), PathBuf::from("/file2.txt")],
    /// }];
    ///
    /// let output = JsonOutput::new(&sets, &TraversalStats::default(), ExitCode::Success);
    /// assert_eq!(output.duplicates.len(), 1);
    /// ```
    #[must_use]
    pub fn new(sets: &[DuplicateSet], stats: &TraversalStats, exit_code: ExitCode) -> Self {
        Self {
            duplicates: sorted_for_display(sets)
                .iter()
                .map(JsonDuplicateSet::from)
                .collect(),
            summary: JsonSummary::new(stats, exit_code),
        }
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        if pretty {
            serde_json::to_writer_pretty(&mut *writer, self)?;
        } else {
            serde_json::to_writer(&mut *writer, self)?;
        }
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
