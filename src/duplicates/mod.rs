//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size classification and candidate selection during the walk
//! - Concurrent content hashing through a bounded worker pool
//! - Digest grouping into confirmed duplicate sets
//! - The coordinator that runs all of the above as one pipeline

pub mod classifier;
pub mod finder;
pub mod groups;
pub mod pool;

pub use classifier::{ClassifierReport, ClassifierStats, Emission, SizeClassifier};
pub use finder::{default_workers, DuplicateFinder, FinderConfig, FinderError, TraversalStats};
pub use groups::{DigestGroups, DuplicateSet};
pub use pool::{FanIn, HashedFile, PoolConfig, WorkerPool, WorkerStats};
