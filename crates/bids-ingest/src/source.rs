use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use bids_model::{PhysioFiles, SeriesLocator};

/// A series as found by discovery, before its headers are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesSource {
    pub locator: SeriesLocator,
    /// DICOM file a reader takes the header from. Header tables have none.
    pub representative: Option<Representative>,
    pub physio: PhysioFiles,
}

impl SeriesSource {
    pub fn new(locator: SeriesLocator) -> Self {
        Self {
            locator,
            representative: None,
            physio: PhysioFiles::default(),
        }
    }
}

/// Where the representative DICOM file of a series lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Representative {
    File(PathBuf),
    Archived(ArchivedFile),
}

impl fmt::Display for Representative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Archived(file) => write!(f, "{}:{}", file.archive.display(), file.member),
        }
    }
}

/// An archive member, extracted into memory during discovery.
#[derive(Clone, PartialEq, Eq)]
pub struct ArchivedFile {
    pub archive: PathBuf,
    /// `/`-separated path inside the archive.
    pub member: String,
    pub bytes: Arc<[u8]>,
}

impl fmt::Debug for ArchivedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchivedFile")
            .field("archive", &self.archive)
            .field("member", &self.member)
            .field("len", &self.bytes.len())
            .finish()
    }
}
