//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//!
//! [`Hasher`] computes the BLAKE3 digest of a file's full content by reading it
//! through a buffer capped at the configured size, so memory use does not
//! depend on file size.
//!
//! Failed reads are reported as [`HashError`]; the caller decides what to do
//! with the path. By default nothing is retried. Retrying transient errors is
//! an explicit opt-in via [`Hasher::with_retries`].

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::HashError;

/// BLAKE3 digest (32 bytes).
pub type Hash = [u8; 32];

/// Default read buffer size (2 MiB).
pub const DEFAULT_BUFFER_SIZE: usize = 2 * 1024 * 1024;

/// Smallest buffer the hasher will use.
const MIN_BUFFER_SIZE: usize = 4 * 1024;

/// Streaming content hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    buffer_size: usize,
    retries: u32,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default buffer size and no retries.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            retries: 0,
            shutdown_flag: None,
        }
    }

    /// Set the read buffer size (clamped to at least 4 KiB).
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(MIN_BUFFER_SIZE);
        self
    }

    /// Retry a file up to `retries` more times when the read fails with a
    /// transient error. Permanent errors are never retried.
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the shutdown flag. Hashing stops between buffer reads once raised.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Configured read buffer size.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Configured retry budget.
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.retries
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Hash the full content of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read, or
    /// [`HashError::Interrupted`] if shutdown was requested mid-read.
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let mut attempt = 0;
        loop {
            match self.hash_once(path) {
                Err(HashError::Io { source, .. })
                    if attempt < self.retries && is_transient(source.kind()) =>
                {
                    attempt += 1;
                    log::debug!(
                        "Transient read error on {} ({}), retry {}/{}",
                        path.display(),
                        source,
                        attempt,
                        self.retries
                    );
                }
                result => return result,
            }
        }
    }

    /// Buffer length for a file of `file_len` bytes: never more than the
    /// configured size, and one byte past the length so EOF shows up on the
    /// same pass. A file that grows after the stat is read in more chunks.
    fn read_len(&self, file_len: Option<u64>) -> usize {
        file_len
            .and_then(|len| usize::try_from(len.saturating_add(1)).ok())
            .map_or(self.buffer_size, |len| len.min(self.buffer_size))
    }

    fn hash_once(&self, path: &Path) -> Result<Hash, HashError> {
        let mut file =
            File::open(path).map_err(|e| HashError::from_io(path.to_path_buf(), e))?;
        let file_len = file.metadata().ok().map(|m| m.len());
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; self.read_len(file_len)];

        loop {
            if self.is_shutdown_requested() {
                return Err(HashError::Interrupted(path.to_path_buf()));
            }
            match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    hasher.update(&buffer[..n]);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path.to_path_buf(), e)),
            }
        }

        Ok(*hasher.finalize().as_bytes())
    }
}

/// Errors worth another attempt when retries are enabled.
fn is_transient(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Render a digest as lowercase hexadecimal (64 characters).
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    blake3::Hash::from_bytes(*hash).to_hex().to_string()
}
