//! Plain text output: one line per duplicate set.
//!
//! ```text
//! duplicate files (3 x 1048576): /data/a.bin /data/b.bin /data/old/a.bin
//! ```

use std::io::{self, Write};

use super::sorted_for_display;
use crate::duplicates::DuplicateSet;

/// Line-per-set text formatter.
#[derive(Debug, Clone)]
pub struct TextOutput {
    sets: Vec<DuplicateSet>,
}

impl TextOutput {
    /// Prepare `sets` for display.
    #[must_use]
    pub fn new(sets: &[DuplicateSet]) -> Self {
        Self {
            sets: sorted_for_display(sets),
        }
    }

    /// The line printed for one set.
    #[must_use]
    pub fn format_set(set: &DuplicateSet) -> String {
        let paths: Vec<String> = set
            .paths
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        format!(
            "duplicate files ({} x {}): {}",
            set.len(),
            set.size,
            paths.join(" ")
        )
    }

    /// Write every set, one per line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for set in &self.sets {
            writeln!(writer, "{}", Self::format_set(set))?;
        }
        writer.flush()
    }
}
