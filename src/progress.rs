//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`Progress`] struct which implements
//! [`ProgressCallback`] to display a walk spinner and a hashing bar in the
//! terminal. The hashing bar grows as candidates are discovered, since the
//! total is not known until the walk ends.

use std::path::Path;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::scanner::FileRecord;

/// Progress callback for the duplicate detection pipeline.
///
/// Implementations are called from the traversal thread and from every
/// hashing worker, so they must be cheap and thread-safe. All methods
/// default to doing nothing.
pub trait ProgressCallback: Send + Sync {
    /// A regular file was visited by the walk.
    fn on_file_seen(&self, _path: &Path) {}

    /// A file was queued for hashing.
    fn on_candidate(&self, _record: &FileRecord) {}

    /// A worker finished hashing a file of `bytes` bytes.
    fn on_hashed(&self, _path: &Path, _bytes: u64) {}

    /// The pipeline has stopped; no further calls follow.
    fn on_finish(&self) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    // Kept alive for the lifetime of the bars it draws.
    _multi: MultiProgress,
    walking: ProgressBar,
    hashing: ProgressBar,
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("files_seen", &self.walking.position())
            .field("hashed", &self.hashing.position())
            .field("candidates", &self.hashing.length())
            .finish()
    }
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// With `quiet` set, nothing is drawn.
    ///
    /// # Examples
    ///
    /// ```
    /// use finddups::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        let multi = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };

        let walking = multi.add(ProgressBar::new_spinner());
        walking.set_style(walking_style());
        walking.set_message("Walking");

        let hashing = multi.add(ProgressBar::new(0));
        hashing.set_style(hashing_style());
        hashing.set_message("Hashing");

        if !quiet {
            walking.enable_steady_tick(Duration::from_millis(100));
        }

        Self {
            _multi: multi,
            walking,
            hashing,
        }
    }
}

fn walking_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
}

fn hashing_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} ({percent}%) {msg} {per_sec}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█>-")
}

impl ProgressCallback for Progress {
    fn on_file_seen(&self, _path: &Path) {
        self.walking.inc(1);
    }

    fn on_candidate(&self, _record: &FileRecord) {
        self.hashing.inc_length(1);
    }

    fn on_hashed(&self, path: &Path, _bytes: u64) {
        self.hashing.inc(1);
        self.hashing.set_message(truncate_path(path, 30));
    }

    fn on_finish(&self) {
        self.walking.finish_with_message("Walk complete");
        self.hashing.finish_with_message("Hashing complete");
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &Path, max_len: usize) -> String {
    let display = path.to_string_lossy();
    if display.chars().count() <= max_len {
        return display.into_owned();
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name
            .chars()
            .skip(name_len.saturating_sub(max_len.saturating_sub(3)))
            .collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
