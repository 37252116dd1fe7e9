//! Output formatters for duplicate scan results.
//!
//! - Text: one line per duplicate set, for people
//! - JSON: a single document, for scripting
//!
//! Sets come out of the pipeline in no particular order. Both formatters
//! present them through [`sorted_for_display`] so that repeated runs print
//! identical output.
//!
//! # Example
//!
//! ```no_run
//! use finddups::duplicates::DuplicateFinder;
//! use finddups::output::TextOutput;
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (sets, _stats) = finder.find_duplicates(Path::new(".")).unwrap();
//!
//! TextOutput::new(&sets).write_to(&mut std::io::stdout()).unwrap();
//! ```

pub mod json;
pub mod text;

pub use json::{JsonOutput, JsonOutputError};
pub use text::TextOutput;

use crate::duplicates::DuplicateSet;

/// Copy of `sets` with members sorted by path and sets ordered by size
/// (largest first), then by their first path.
#[must_use]
pub fn sorted_for_display(sets: &[DuplicateSet]) -> Vec<DuplicateSet> {
    let mut sorted: Vec<DuplicateSet> = sets
        .iter()
        .cloned()
        .map(|mut set| {
            set.paths.sort();
            set
        })
        .collect();
    sorted.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then_with(|| a.paths.first().cmp(&b.paths.first()))
    });
    sorted
}
