//! Ctrl+C cancellation.
//!
//! [`install_handler`] registers a process-wide Ctrl+C hook that raises a
//! shared [`Cancellation`] flag. The flag is handed to the finder, which
//! passes it down to the walker, the classifier, every worker and the
//! hasher. Nothing is killed: each stage notices the flag at its next check
//! and winds down, and the run ends with exit code 130.
//!
//! ```rust,no_run
//! use finddups::duplicates::FinderConfig;
//! use finddups::signal::install_handler;
//!
//! let cancel = install_handler().expect("Failed to install signal handler");
//! let config = FinderConfig::default().with_shutdown_flag(cancel.flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    /// A flag that has not been raised.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether the flag has been raised.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Lower the flag so a new run can start.
    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// The underlying flag, for [`crate::duplicates::FinderConfig::with_shutdown_flag`].
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static INSTALLED: OnceLock<Cancellation> = OnceLock::new();

/// Install the Ctrl+C hook and return the flag it raises.
///
/// Calling this again in the same process returns the already installed
/// flag, cleared. If some other code owns the Ctrl+C hook, a flag that only
/// responds to [`Cancellation::cancel`] is returned instead.
///
/// # Errors
///
/// Returns an error if the platform handler cannot be registered for a
/// reason other than one already being present.
pub fn install_handler() -> Result<Cancellation, SignalError> {
    if let Some(existing) = INSTALLED.get() {
        existing.clear();
        return Ok(existing.clone());
    }

    let cancellation = Cancellation::new();
    let flag = cancellation.flag();

    let registered = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "\nInterrupted. Finishing in-flight work...");
        let _ = stderr.flush();
        log::info!("Cancellation requested");
    });

    match registered {
        Ok(()) => Ok(INSTALLED.get_or_init(|| cancellation).clone()),
        Err(ctrlc::Error::MultipleHandlers) => {
            log::debug!("Ctrl+C handler already registered, using an unhooked flag");
            Ok(INSTALLED.get_or_init(Cancellation::new).clone())
        }
        Err(e) => Err(SignalError::InstallFailed(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_not_cancelled() {
        assert!(!Cancellation::new().is_cancelled());
    }

    #[test]
    fn test_cancel_and_clear() {
        let cancel = Cancellation::new();
        cancel.cancel();
        assert!(cancel.is_cancelled());

        cancel.clear();
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn test_flag_shared_with_clones() {
        let cancel = Cancellation::new();
        let cloned = cancel.clone();
        let flag = cancel.flag();

        flag.store(true, Ordering::SeqCst);
        assert!(cloned.is_cancelled());
    }

    #[test]
    fn test_install_twice_returns_same_flag() {
        let first = install_handler().unwrap();
        let second = install_handler().unwrap();

        second.cancel();
        assert!(first.is_cancelled());
        second.clear();
    }
}
