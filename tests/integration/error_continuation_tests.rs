use finddups::duplicates::{DuplicateFinder, FinderConfig, FinderError};
use finddups::scanner::FileRecord;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn finder() -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default().with_workers(2))
}

#[test]
fn test_vanished_file_is_skipped_and_counted() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, b"hello").unwrap();
    fs::write(&b, b"hello").unwrap();

    let records = vec![
        FileRecord::new(&a, 5),
        FileRecord::new(&b, 5),
        FileRecord::new(dir.path().join("gone.txt"), 5),
    ];
    let (sets, stats) = finder().find_duplicates_from_files(records).unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].len(), 2);
    assert_eq!(stats.hash_attempts, 3);
    assert_eq!(stats.hash_failures, 1);
    assert_eq!(stats.hash_errors.len(), 1);
    assert!(stats.hash_errors[0].path().ends_with("gone.txt"));
}

#[test]
fn test_all_members_unreadable_yields_no_set() {
    let dir = tempdir().unwrap();
    let records = vec![
        FileRecord::new(dir.path().join("x"), 10),
        FileRecord::new(dir.path().join("y"), 10),
    ];

    let (sets, stats) = finder().find_duplicates_from_files(records).unwrap();

    assert!(sets.is_empty());
    assert_eq!(stats.hash_failures, 2);
    assert!(!stats.interrupted);
}

#[cfg(unix)]
#[test]
fn test_unreadable_subdirectory_does_not_stop_scan() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"duplicate").unwrap();
    fs::write(dir.path().join("b.txt"), b"duplicate").unwrap();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("inner.txt"), b"duplicate").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Permission bits do not bind a privileged user.
    let enforced = fs::read_dir(&locked).is_err();

    let result = finder().find_duplicates(dir.path());
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let (sets, stats) = result.unwrap();
    assert_eq!(sets.len(), 1);
    if enforced {
        assert_eq!(sets[0].len(), 2);
        assert!(!stats.traversal_errors.is_empty());
    } else {
        assert_eq!(sets[0].len(), 3);
    }
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_left_out_of_set() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"duplicate").unwrap();
    fs::write(dir.path().join("b.txt"), b"duplicate").unwrap();
    let locked = dir.path().join("c.txt");
    fs::write(&locked, b"duplicate").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    let enforced = fs::File::open(&locked).is_err();

    let result = finder().find_duplicates(dir.path());
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    let (sets, stats) = result.unwrap();
    assert_eq!(sets.len(), 1);
    assert_eq!(stats.hash_attempts, 3);
    if enforced {
        assert_eq!(sets[0].len(), 2);
        assert_eq!(stats.hash_failures, 1);
    } else {
        assert_eq!(sets[0].len(), 3);
    }
}

#[test]
fn test_nonexistent_root_fails() {
    let result = finder().find_duplicates(Path::new("/non/existent/finddups/root"));
    assert!(matches!(result, Err(FinderError::RootNotFound { .. })));
}

#[test]
fn test_file_root_fails() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("file.txt");
    fs::write(&file, b"content").unwrap();

    match finder().find_duplicates(&file) {
        Err(FinderError::NotADirectory(path)) => assert_eq!(path, file),
        other => panic!("expected NotADirectory, got {other:?}"),
    }
}

#[test]
fn test_root_error_messages_name_the_path() {
    let err = finder()
        .find_duplicates(Path::new("/non/existent/finddups/root"))
        .unwrap_err();
    assert!(err.to_string().contains("/non/existent/finddups/root"));
}
