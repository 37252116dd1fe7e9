//! Digest grouping and confirmed duplicate sets.
//!
//! # Overview
//!
//! [`DigestGroups`] is the aggregation side of the pipeline. It is fed
//! [`HashedFile`] values as workers produce them and keeps, per content
//! digest, the paths that hashed to it. Files are keyed on both digest and
//! size, so two paths only ever land in the same set when their sizes and
//! their digests are equal.
//!
//! Once the result stream closes, [`DigestGroups::into_duplicates`] drops
//! the singletons (size collisions that turned out to differ in content)
//! and returns one [`DuplicateSet`] per remaining group.
//!
//! # Example
//!
//! ```
//! use finddups::duplicates::{DigestGroups, HashedFile};
//! use std::path::PathBuf;
//!
//! let mut groups = DigestGroups::new();
//! for name in ["/a", "/b", "/c"] {
//!     let digest = if name == "/c" { [2u8; 32] } else { [1u8; 32] };
//!     groups.add(HashedFile { digest, path: PathBuf::from(name), size: 10 });
//! }
//!
//! let sets = groups.into_duplicates();
//! assert_eq!(sets.len(), 1);
//! assert_eq!(sets[0].len(), 2);
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::pool::HashedFile;
use crate::scanner::{hash_to_hex, Hash};

/// Two or more paths with identical size and content digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateSet {
    /// BLAKE3 digest shared by every member
    pub digest: Hash,
    /// File size in bytes shared by every member
    pub size: u64,
    /// Member paths, in arrival order
    pub paths: Vec<PathBuf>,
}

impl DuplicateSet {
    /// Number of files in this set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if this set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Number of redundant copies (all members but one).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.paths.len().saturating_sub(1)
    }

    /// Bytes that removing the redundant copies would free.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }

    /// Digest as hexadecimal string.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        hash_to_hex(&self.digest)
    }

    /// Whether `path` is a member.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

/// Digest → paths index, owned by the aggregating thread.
#[derive(Debug, Default)]
pub struct DigestGroups {
    groups: HashMap<(Hash, u64), Vec<PathBuf>>,
    files: usize,
}

impl DigestGroups {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one hashed file.
    pub fn add(&mut self, file: HashedFile) {
        self.files += 1;
        self.groups
            .entry((file.digest, file.size))
            .or_default()
            .push(file.path);
    }

    /// Record every file from `results` until it ends.
    pub fn extend<I: IntoIterator<Item = HashedFile>>(&mut self, results: I) {
        for file in results {
            self.add(file);
        }
    }

    /// Files recorded so far.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files
    }

    /// Distinct (digest, size) keys recorded so far.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Finish aggregation, discarding singleton groups.
    #[must_use]
    pub fn into_duplicates(self) -> Vec<DuplicateSet> {
        let mut singletons = 0usize;
        let sets: Vec<DuplicateSet> = self
            .groups
            .into_iter()
            .filter_map(|((digest, size), paths)| {
                if paths.len() < 2 {
                    singletons += 1;
                    log::trace!(
                        "Eliminated unique content {}: {}",
                        hash_to_hex(&digest),
                        paths[0].display()
                    );
                    None
                } else {
                    log::debug!(
                        "Duplicate set {}: {} files of {} bytes",
                        hash_to_hex(&digest),
                        paths.len(),
                        size
                    );
                    Some(DuplicateSet {
                        digest,
                        size,
                        paths,
                    })
                }
            })
            .collect();

        log::debug!(
            "Aggregation: {} duplicate sets, {} size collisions with distinct content",
            sets.len(),
            singletons
        );
        sets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashed(path: &str, digest: u8, size: u64) -> HashedFile {
        HashedFile {
            digest: [digest; 32],
            path: PathBuf::from(path),
            size,
        }
    }

    #[test]
    fn test_empty_groups() {
        let groups = DigestGroups::new();
        assert_eq!(groups.file_count(), 0);
        assert!(groups.into_duplicates().is_empty());
    }

    #[test]
    fn test_singletons_discarded() {
        let mut groups = DigestGroups::new();
        groups.add(hashed("/a", 1, 10));
        groups.add(hashed("/b", 2, 10));

        assert_eq!(groups.group_count(), 2);
        assert!(groups.into_duplicates().is_empty());
    }

    #[test]
    fn test_matching_digests_grouped() {
        let mut groups = DigestGroups::new();
        groups.extend(vec![
            hashed("/a", 1, 10),
            hashed("/b", 1, 10),
            hashed("/c", 1, 10),
            hashed("/d", 2, 10),
        ]);

        let sets = groups.into_duplicates();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].len(), 3);
        assert!(sets[0].contains(Path::new("/a")));
        assert!(!sets[0].contains(Path::new("/d")));
    }

    #[test]
    fn test_same_digest_different_size_kept_apart() {
        let mut groups = DigestGroups::new();
        groups.add(hashed("/a", 1, 10));
        groups.add(hashed("/b", 1, 20));

        assert!(groups.into_duplicates().is_empty());
    }

    #[test]
    fn test_duplicate_set_accounting() {
        let set = DuplicateSet {
            digest: [7; 32],
            size: 100,
            paths: vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/c")],
        };

        assert_eq!(set.duplicate_count(), 2);
        assert_eq!(set.wasted_space(), 200);
        assert_eq!(set.digest_hex().len(), 64);
        assert!(!set.is_empty());
    }
}
