//! Series discovery on disk.
//!
//! Compressed exam archives (`*.tgz`) directly under the root are listed
//! first, see [`crate::archive`]. Then every directory holding at least one
//! `.dcm` file is a series; its first file in name order represents it.
//! Physiological traces (`.1D`) live in a `realtime` directory next to the
//! series directories and are attached by scan number.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use bids_model::{PhysioFiles, SeriesLocator};

use crate::archive::{discover_archive, find_archives};
use crate::error::{IngestError, Result};
use crate::source::{Representative, SeriesSource};

pub(crate) const DICOM_EXTENSION: &str = "dcm";
pub(crate) const PHYSIO_EXTENSION: &str = "1D";
pub(crate) const REALTIME_DIR: &str = "realtime";
const CARDIAC_MARKER: &str = "ECG";
const RESPIRATORY_MARKER: &str = "Resp";

/// Finds every series under `root`, archived series first, each part
/// ordered by locator.
///
/// An archive that cannot be read is logged and left out; its series are
/// not reported.
pub fn discover_series(root: &Path) -> Result<Vec<SeriesSource>> {
    if !root.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut series = Vec::new();
    let archives = find_archives(root)?;
    for archive in &archives {
        match discover_archive(archive) {
            Ok(found) => series.extend(found),
            Err(err) => warn!(error = %err, "skipping unreadable archive"),
        }
    }
    let archived = series.len();

    let mut plain = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let listing = list_directory(&dir)?;
        pending.extend(listing.dirs);

        let Some(representative) =
            listing.files.into_iter().find(|path| has_extension(path, DICOM_EXTENSION))
        else {
            continue;
        };
        let locator = relative_locator(root, &dir);
        let physio = attach_physio(root, &dir)?;
        plain.push(SeriesSource {
            locator: SeriesLocator::new(locator),
            representative: Some(Representative::File(representative)),
            physio,
        });
    }
    plain.sort_by(|a, b| a.locator.cmp(&b.locator));
    series.extend(plain);
    debug!(
        root = %root.display(),
        archives = archives.len(),
        archived,
        series = series.len(),
        "discovered series"
    );
    Ok(series)
}

struct Listing {
    dirs: Vec<PathBuf>,
    files: Vec<PathBuf>,
}

/// Reads one directory; both lists come back sorted by name.
fn list_directory(dir: &Path) -> Result<Listing> {
    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut listing = Listing {
        dirs: Vec::new(),
        files: Vec::new(),
    };
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() {
            listing.dirs.push(path);
        } else if path.is_file() {
            listing.files.push(path);
        }
    }
    listing.dirs.sort();
    listing.files.sort();
    Ok(listing)
}

pub(crate) fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// `/`-joined path of `dir` below `root`.
fn relative_locator(root: &Path, dir: &Path) -> String {
    let relative = dir.strip_prefix(root).unwrap_or(dir);
    let parts: Vec<String> = relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Trace files for the series in `series_dir`, looked up in the sibling
/// `realtime` directory.
fn attach_physio(root: &Path, series_dir: &Path) -> Result<PhysioFiles> {
    let Some(scan) = scan_number(series_dir) else {
        return Ok(PhysioFiles::default());
    };
    let Some(parent) = series_dir.parent() else {
        return Ok(PhysioFiles::default());
    };
    let realtime = parent.join(REALTIME_DIR);
    if !realtime.is_dir() || realtime == series_dir {
        return Ok(PhysioFiles::default());
    }

    let files = list_directory(&realtime)?.files;
    let traces = files.iter().filter_map(|file| {
        let name = file.file_name()?.to_str()?;
        Some((name, relative_locator(root, file)))
    });
    Ok(match_physio(&scan, traces))
}

/// Picks the cardiac and respiratory traces of scan `scan` from
/// `(file name, recorded path)` pairs. The first match of each kind wins.
pub(crate) fn match_physio<'a>(
    scan: &str,
    traces: impl IntoIterator<Item = (&'a str, String)>,
) -> PhysioFiles {
    let mut physio = PhysioFiles::default();
    for (name, path) in traces {
        if !has_extension(Path::new(name), PHYSIO_EXTENSION) || !names_scan(name, scan) {
            continue;
        }
        if name.contains(CARDIAC_MARKER) {
            physio.cardiac.get_or_insert(path);
        } else if name.contains(RESPIRATORY_MARKER) {
            physio.respiratory.get_or_insert(path);
        }
    }
    physio
}

/// Suffix after the last `_` of the directory name.
pub(crate) fn scan_number(series_dir: &Path) -> Option<String> {
    let name = series_dir.file_name()?.to_str()?;
    let (_, number) = name.rsplit_once('_')?;
    (!number.is_empty()).then(|| number.to_string())
}

/// True when `name` contains `scan_<number>` not followed by another digit.
fn names_scan(name: &str, number: &str) -> bool {
    let needle = format!("scan_{number}");
    name.match_indices(&needle).any(|(start, _)| {
        !name[start + needle.len()..]
            .chars()
            .next()
            .is_some_and(|next| next.is_ascii_digit())
    })
}
