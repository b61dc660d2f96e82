//! Per-run counters and skip diagnostics.

use serde::Serialize;

/// A line dropped by the record driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    /// 0-based position of the file among the run's inputs.
    pub file_index: usize,
    /// 1-based line number within that file.
    pub line_number: u64,
    pub line: String,
    pub reason: String,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub files: usize,
    pub records: u64,
    pub defaults_applied: u64,
    /// Records whose trailing extra fields were dropped.
    pub extra_columns_discarded: u64,
    pub skipped: Vec<SkippedLine>,
}

impl RunSummary {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}
