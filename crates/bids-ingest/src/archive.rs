//! Series discovery inside compressed exam archives (`*.tgz`).
//!
//! Each archive is streamed once. The first `.dcm` member of each directory,
//! in archive order, represents that series and is read into memory; `.1D`
//! members are collected as physiological traces. Locators are
//! archive-relative directory paths.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;

use bids_model::{PhysioFiles, SeriesLocator};

use crate::discovery::{
    DICOM_EXTENSION, PHYSIO_EXTENSION, REALTIME_DIR, has_extension, match_physio, scan_number,
};
use crate::error::{IngestError, Result};
use crate::source::{ArchivedFile, Representative, SeriesSource};

pub const ARCHIVE_EXTENSION: &str = "tgz";

struct Member {
    dir: String,
    name: String,
}

impl Member {
    fn parse(path: &Path) -> Option<Self> {
        let parts: Vec<String> = path
            .components()
            .filter_map(|part| match part {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        let (name, dirs) = parts.split_last()?;
        Some(Self {
            dir: dirs.join("/"),
            name: name.clone(),
        })
    }

    fn path(&self) -> String {
        if self.dir.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.dir, self.name)
        }
    }
}

/// Lists the series in one archive, ordered by locator.
pub fn discover_archive(path: &Path) -> Result<Vec<SeriesSource>> {
    let archive_error = |source| IngestError::Archive {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(archive_error)?;
    let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));

    let mut seen_dirs = BTreeSet::new();
    let mut series: Vec<(String, ArchivedFile)> = Vec::new();
    let mut traces: Vec<Member> = Vec::new();
    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let entry_path = entry.path().map_err(archive_error)?.into_owned();
        let Some(member) = Member::parse(&entry_path) else {
            continue;
        };

        if has_extension(Path::new(&member.name), PHYSIO_EXTENSION) {
            traces.push(member);
        } else if is_dicom(&member.name) && seen_dirs.insert(member.dir.clone()) {
            let mut bytes = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or_default());
            entry.read_to_end(&mut bytes).map_err(archive_error)?;
            let file = ArchivedFile {
                archive: path.to_path_buf(),
                member: member.path(),
                bytes: Arc::from(bytes),
            };
            series.push((member.dir, file));
        }
    }

    let mut sources: Vec<SeriesSource> = series
        .into_iter()
        .map(|(dir, file)| SeriesSource {
            physio: physio_for(&dir, &traces),
            locator: SeriesLocator::new(if dir.is_empty() { ".".to_string() } else { dir }),
            representative: Some(Representative::Archived(file)),
        })
        .collect();
    sources.sort_by(|a, b| a.locator.cmp(&b.locator));
    debug!(archive = %path.display(), series = sources.len(), "listed archive");
    Ok(sources)
}

/// Top-level `*.tgz` files of `root`, sorted by name.
pub fn find_archives(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(root).map_err(|source| IngestError::DirectoryRead {
        path: root.to_path_buf(),
        source,
    })?;
    let mut archives = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| IngestError::DirectoryRead {
                path: root.to_path_buf(),
                source,
            })?
            .path();
        if path.is_file() && has_extension(&path, ARCHIVE_EXTENSION) {
            archives.push(path);
        }
    }
    archives.sort();
    Ok(archives)
}

fn is_dicom(name: &str) -> bool {
    has_extension(Path::new(name), DICOM_EXTENSION)
}

/// Traces in the `realtime` directory next to `series_dir`.
fn physio_for(series_dir: &str, traces: &[Member]) -> PhysioFiles {
    let series_path = Path::new(series_dir);
    let Some(scan) = scan_number(series_path) else {
        return PhysioFiles::default();
    };
    let realtime = match series_dir.rsplit_once('/') {
        Some((parent, _)) => format!("{parent}/{REALTIME_DIR}"),
        None => REALTIME_DIR.to_string(),
    };
    match_physio(
        &scan,
        traces
            .iter()
            .filter(|trace| trace.dir == realtime)
            .map(|trace| (trace.name.as_str(), trace.path())),
    )
}
