use std::path::PathBuf;

use bids_core::SkippedSeries;
use bids_model::MappingTable;

/// Result of one `map` run.
#[derive(Debug)]
pub struct MapOutcome {
    pub dicom_dir: PathBuf,
    /// Where the mapping table went; `None` on a dry run.
    pub output: Option<PathBuf>,
    pub table: MappingTable,
    pub skipped: Vec<SkippedSeries>,
    pub workers: usize,
}

impl MapOutcome {
    pub fn discovered(&self) -> usize {
        self.table.len() + self.skipped.len()
    }
}

/// One row of the `plan` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSeries {
    pub scan_dir: String,
    pub target: Result<PathBuf, String>,
}
