use finddups::duplicates::{DuplicateFinder, DuplicateSet, FinderConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn finder() -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default().with_workers(2))
}

fn sorted_paths(set: &DuplicateSet) -> Vec<PathBuf> {
    let mut paths = set.paths.clone();
    paths.sort();
    paths
}

fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();

    let (sets, stats) = finder().find_duplicates(dir.path()).unwrap();

    assert!(sets.is_empty());
    assert_eq!(stats.files_seen, 0);
    assert_eq!(stats.hash_attempts, 0);
}

#[test]
fn test_scan_unique_sizes_are_never_hashed() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"1");
    write(dir.path(), "b.txt", b"22");
    write(dir.path(), "c.txt", b"333");

    let (sets, stats) = finder().find_duplicates(dir.path()).unwrap();

    assert!(sets.is_empty());
    assert_eq!(stats.files_seen, 3);
    assert_eq!(stats.unique_size_files(), 3);
    assert_eq!(stats.hash_attempts, 0);
}

#[test]
fn test_scan_same_size_different_content() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"aaaa");
    write(dir.path(), "b.txt", b"bbbb");

    let (sets, stats) = finder().find_duplicates(dir.path()).unwrap();

    assert!(sets.is_empty());
    assert_eq!(stats.hash_attempts, 2);
}

#[test]
fn test_scan_finds_duplicates_across_subdirectories() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a/one.bin", b"same content");
    let b = write(dir.path(), "b/c/two.bin", b"same content");
    let c = write(dir.path(), "d/e/f/three.bin", b"same content");
    write(dir.path(), "other.bin", b"different!!!");

    let (sets, stats) = finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].size, 12);
    let mut expected = vec![a, b, c];
    expected.sort();
    assert_eq!(sorted_paths(&sets[0]), expected);
    assert_eq!(stats.duplicate_files, 2);
    assert_eq!(stats.reclaimable_space, 24);
}

#[test]
fn test_scan_multiple_sets_same_size() {
    let dir = tempdir().unwrap();
    write(dir.path(), "x1", b"xxxx");
    write(dir.path(), "x2", b"xxxx");
    write(dir.path(), "y1", b"yyyy");
    write(dir.path(), "y2", b"yyyy");
    write(dir.path(), "z", b"zzzz");

    let (sets, stats) = finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(sets.len(), 2);
    assert!(sets.iter().all(|s| s.len() == 2 && s.size == 4));
    assert_ne!(sets[0].digest, sets[1].digest);
    assert_eq!(stats.hash_attempts, 5);
}

#[test]
fn test_scan_threshold_is_exclusive() {
    let dir = tempdir().unwrap();
    write(dir.path(), "small1", &[b'a'; 100]);
    write(dir.path(), "small2", &[b'a'; 100]);
    write(dir.path(), "big1", &[b'b'; 101]);
    write(dir.path(), "big2", &[b'b'; 101]);

    let config = FinderConfig::default().with_workers(2).with_min_size(100);
    let (sets, stats) = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].size, 101);
    assert_eq!(stats.files_seen, 4);
    assert_eq!(stats.eligible_files, 2);
}

#[test]
fn test_scan_files_larger_than_read_buffer() {
    let dir = tempdir().unwrap();
    let mut content = vec![7u8; 300 * 1024];
    write(dir.path(), "big1", &content);
    write(dir.path(), "big2", &content);
    // Same size, differs only in the last byte.
    *content.last_mut().unwrap() = 8;
    write(dir.path(), "big3", &content);

    let config = FinderConfig::default()
        .with_workers(3)
        .with_buffer_size(8 * 1024);
    let (sets, stats) = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].len(), 2);
    assert!(!sets[0].contains(&dir.path().join("big3")));
    assert_eq!(stats.bytes_hashed, 3 * 300 * 1024);
}

#[test]
fn test_scan_single_worker_matches_many_workers() {
    let dir = tempdir().unwrap();
    for i in 0..30u8 {
        let content = vec![i % 6; 10 + usize::from(i % 3)];
        write(dir.path(), &format!("f{i:02}"), &content);
    }

    let one = DuplicateFinder::new(FinderConfig::default().with_workers(1))
        .find_duplicates(dir.path())
        .unwrap();
    let many = DuplicateFinder::new(FinderConfig::default().with_workers(8))
        .find_duplicates(dir.path())
        .unwrap();

    let normalize = |sets: &[DuplicateSet]| {
        let mut all: Vec<Vec<PathBuf>> = sets.iter().map(sorted_paths).collect();
        all.sort();
        all
    };
    assert_eq!(normalize(&one.0), normalize(&many.0));
    assert_eq!(one.1.hash_attempts, many.1.hash_attempts);
}

#[cfg(unix)]
#[test]
fn test_scan_symlinks_not_followed_by_default() {
    use std::os::unix::fs::symlink;

    let dir = tempdir().unwrap();
    let target = write(dir.path(), "target.txt", b"linked content");
    symlink(&target, dir.path().join("link.txt")).unwrap();

    let (sets, stats) = finder().find_duplicates(dir.path()).unwrap();

    assert!(sets.is_empty());
    assert_eq!(stats.files_seen, 1);
}

#[cfg(unix)]
#[test]
fn test_scan_symlinks_followed_when_enabled() {
    use std::os::unix::fs::symlink;

    let dir = tempdir().unwrap();
    let target = write(dir.path(), "data/target.txt", b"linked content");
    let outside = tempdir().unwrap();
    let other = write(outside.path(), "copy.txt", b"linked content");
    symlink(&target, dir.path().join("link.txt")).unwrap();
    symlink(outside.path(), dir.path().join("outside")).unwrap();

    let config = FinderConfig::default()
        .with_workers(2)
        .with_follow_symlinks(true);
    let (sets, stats) = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(stats.files_seen, 3);
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].len(), 3);
    assert!(sets[0].contains(&dir.path().join("outside").join("copy.txt")));
    assert!(other.exists());
}

#[test]
fn test_scan_stats_are_consistent() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"abc");
    write(dir.path(), "b", b"abc");
    write(dir.path(), "c", b"abc");
    write(dir.path(), "d", b"abcd");
    write(dir.path(), "e", b"");

    let (sets, stats) = finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(stats.files_seen, 5);
    assert_eq!(stats.eligible_files, 4);
    assert_eq!(stats.candidates_emitted, 3);
    assert_eq!(stats.hash_attempts, stats.candidates_emitted);
    assert_eq!(stats.hash_failures, 0);
    assert_eq!(stats.duplicate_sets, 1);
    assert_eq!(stats.duplicate_files, 2);
    assert_eq!(stats.reclaimable_space, 6);
    assert!(!stats.interrupted);
}
