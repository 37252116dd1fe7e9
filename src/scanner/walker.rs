//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! [`Walker`] visits a directory tree once, sequentially, and yields a
//! [`FileRecord`] for every regular file. The walk is single-threaded; its
//! consumer (the size classifier) owns an index with exactly one writer.
//!
//! - Directories, symlinks (unless followed), devices and sockets are skipped
//! - Per-entry failures are yielded as [`ScanError`] values and never stop
//!   the walk
//! - A shutdown flag ends iteration early
//!
//! # Example
//!
//! ```no_run
//! use finddups::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), WalkerConfig::default());
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("Found {} files", files.len());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::WalkDir;

use super::{FileRecord, ScanError, WalkerConfig};

/// Sequential directory walker.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// Once the flag is raised, the iterator returned by [`Walker::walk`]
    /// ends before yielding the next entry.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Root of the walk.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Walk the directory tree, yielding regular files.
    ///
    /// Entries are visited in file-name order within each directory, so two
    /// walks of an unchanged tree yield the same sequence.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileRecord, ScanError>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .take_while(move |_| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                    false
                } else {
                    true
                }
            })
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => self.process_entry(&entry),
                Err(e) => Some(Err(self.convert_error(e))),
            })
    }

    fn process_entry(&self, entry: &walkdir::DirEntry) -> Option<Result<FileRecord, ScanError>> {
        let file_type = entry.file_type();

        if file_type.is_dir() {
            return None;
        }

        if !file_type.is_file() {
            log::trace!("Skipping non-regular file: {}", entry.path().display());
            return None;
        }

        match entry.metadata() {
            Ok(metadata) => Some(Ok(FileRecord::new(entry.path(), metadata.len()))),
            Err(e) => Some(Err(self.convert_error(e))),
        }
    }

    /// Map a walkdir error onto [`ScanError`] and log it.
    fn convert_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        let scan_error = if let Some(ancestor) = error.loop_ancestor() {
            ScanError::SymlinkLoop {
                path,
                ancestor: ancestor.to_path_buf(),
            }
        } else {
            match error.into_io_error() {
                Some(io_error) => ScanError::from_io(path, io_error),
                None => ScanError::Io {
                    path,
                    source: Arc::new(std::io::Error::other("walk error")),
                },
            }
        };

        match scan_error {
            ScanError::NotFound(ref p) => {
                log::debug!("Entry vanished during walk: {}", p.display());
            }
            ref other => log::warn!("Skipping entry: {}", other),
        }
        scan_error
    }
}
