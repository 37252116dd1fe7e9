//! finddups - duplicate file finder
//!
//! Walks a directory tree once, hashes only the files whose size is shared
//! with at least one other file, and reports every set of files with equal
//! size and equal BLAKE3 digest. Hashing runs on a bounded worker pool fed
//! while the walk is still in progress.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io;
use std::sync::Arc;

use anyhow::Context;

use crate::cli::{Cli, OutputFormat};
use crate::config::{CliOverrides, Settings};
use crate::duplicates::{DuplicateFinder, DuplicateSet, TraversalStats};
use crate::error::ExitCode;
use crate::output::{JsonOutput, TextOutput};
use crate::progress::Progress;

/// Run the application for parsed arguments.
///
/// # Errors
///
/// Returns an error if the root cannot be scanned at all, the scan is
/// interrupted, or the results cannot be written.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let settings = Settings::load(cli.config.as_deref(), &CliOverrides::from(&cli));
    log::debug!("Effective settings: {:?}", settings);

    let cancellation = signal::install_handler().context("Failed to set up Ctrl+C handling")?;

    let mut config = settings
        .finder_config()
        .with_shutdown_flag(cancellation.flag());
    if !cli.quiet && !cli.no_progress {
        config = config.with_progress_callback(Arc::new(Progress::new(false)));
    }
    log::debug!(
        "Using {} workers, queue capacity {:?}, min size {} bytes",
        config.workers,
        config.queue_capacity,
        config.min_size
    );

    let finder = DuplicateFinder::new(config);
    let (sets, stats) = finder
        .find_duplicates(&cli.path)
        .with_context(|| format!("Failed to scan {}", cli.path.display()))?;

    log_summary(&stats);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_results(&mut out, cli.output, &sets, &stats)?;

    Ok(ExitCode::Success)
}

/// Write the results in the requested format.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_results<W: io::Write>(
    writer: &mut W,
    format: OutputFormat,
    sets: &[DuplicateSet],
    stats: &TraversalStats,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => TextOutput::new(sets)
            .write_to(writer)
            .context("Failed to write results")?,
        OutputFormat::Json => JsonOutput::new(sets, stats, ExitCode::Success)
            .write_to(writer, true)
            .context("Failed to write JSON results")?,
    }
    Ok(())
}

fn log_summary(stats: &TraversalStats) {
    if !stats.traversal_errors.is_empty() {
        log::warn!(
            "{} entries could not be visited",
            stats.traversal_errors.len()
        );
    }
    if stats.hash_failures > 0 {
        log::warn!(
            "{} files could not be read and were left out",
            stats.hash_failures
        );
    }
    log::info!(
        "Finished in {:.2?}: {} files processed, {} hashes computed, {} duplicate sets, {} reclaimable",
        stats.elapsed,
        stats.files_seen,
        stats.hash_attempts,
        stats.duplicate_sets,
        stats.reclaimable_display()
    );
}
