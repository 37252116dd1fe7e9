use finddups::duplicates::{DuplicateFinder, FinderConfig, FinderError};
use finddups::progress::ProgressCallback;
use finddups::scanner::FileRecord;
use finddups::signal::Cancellation;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

/// Cancels after a number of files have been seen by the walk.
struct CancelAfter {
    cancellation: Cancellation,
    limit: usize,
    seen: AtomicUsize,
}

impl ProgressCallback for CancelAfter {
    fn on_file_seen(&self, _path: &Path) {
        if self.seen.fetch_add(1, Ordering::SeqCst) + 1 == self.limit {
            self.cancellation.cancel();
        }
    }
}

fn populate(dir: &Path, count: usize) {
    for i in 0..count {
        fs::write(dir.join(format!("f{i:04}")), vec![b'x'; 1 + i % 7]).unwrap();
    }
}

#[test]
fn test_cancelled_before_start() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 10);

    let cancellation = Cancellation::new();
    cancellation.cancel();
    let finder = DuplicateFinder::new(
        FinderConfig::default()
            .with_workers(2)
            .with_shutdown_flag(cancellation.flag()),
    );

    let result = finder.find_duplicates(dir.path());
    assert!(matches!(result, Err(FinderError::Interrupted)));
}

#[test]
fn test_cancelled_during_walk() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 300);

    let cancellation = Cancellation::new();
    let callback = Arc::new(CancelAfter {
        cancellation: cancellation.clone(),
        limit: 20,
        seen: AtomicUsize::new(0),
    });
    let finder = DuplicateFinder::new(
        FinderConfig::default()
            .with_workers(2)
            .with_shutdown_flag(cancellation.flag())
            .with_progress_callback(callback.clone()),
    );

    let result = finder.find_duplicates(dir.path());

    assert!(matches!(result, Err(FinderError::Interrupted)));
    assert!(callback.seen.load(Ordering::SeqCst) < 300);
}

#[test]
fn test_cancelled_listed_files() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 100);
    let records: Vec<FileRecord> = (0..100)
        .map(|i| FileRecord::new(dir.path().join(format!("f{i:04}")), 1 + (i % 7) as u64))
        .collect();

    let cancellation = Cancellation::new();
    let finder = DuplicateFinder::new(
        FinderConfig::default()
            .with_workers(1)
            .with_shutdown_flag(cancellation.flag())
            .with_progress_callback(Arc::new(CancelAfter {
                cancellation: cancellation.clone(),
                limit: 3,
                seen: AtomicUsize::new(0),
            })),
    );

    let result = finder.find_duplicates_from_files(records);
    assert!(matches!(result, Err(FinderError::Interrupted)));
}

#[test]
fn test_cleared_flag_allows_another_run() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"dup").unwrap();
    fs::write(dir.path().join("b"), b"dup").unwrap();

    let cancellation = Cancellation::new();
    let finder = DuplicateFinder::new(
        FinderConfig::default()
            .with_workers(2)
            .with_shutdown_flag(cancellation.flag()),
    );

    cancellation.cancel();
    assert!(finder.find_duplicates(dir.path()).is_err());

    cancellation.clear();
    let (sets, _) = finder.find_duplicates(dir.path()).unwrap();
    assert_eq!(sets.len(), 1);
}
