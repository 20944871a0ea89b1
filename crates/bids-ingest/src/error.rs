//! Error types for series discovery and header reading.

use std::path::PathBuf;
use thiserror::Error;

use bids_model::ModelError;

/// Errors raised while locating series. These abort the run.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Directory not found or not readable.
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Failed to read directory entries.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Header Table Errors ===
    /// Failed to parse the header table.
    #[error("failed to parse header table {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Required column not found in the header table.
    #[error("required column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// Two rows describe the same series.
    #[error("series '{locator}' appears more than once in {path}")]
    DuplicateSeries { locator: String, path: PathBuf },

    // === Archive Errors ===
    /// A compressed exam archive could not be listed.
    #[error("failed to read archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while reading one series' headers. The series is skipped.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The series has no file a header can be read from.
    #[error("series {locator} has no DICOM file")]
    MissingRepresentative { locator: String },

    /// The series is not known to the reader.
    #[error("series {locator} is not listed in the header table")]
    UnknownSeries { locator: String },

    /// The header dump program could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The header dump program exited unsuccessfully.
    #[error("{program} exited with {status} on {target}: {stderr}")]
    Exit {
        program: String,
        status: String,
        target: String,
        stderr: String,
    },

    /// The header dump program did not finish in time and was killed.
    #[error("reading {target} timed out after {seconds}s")]
    Timeout { target: String, seconds: u64 },

    /// Failed while feeding or waiting on the header dump program.
    #[error("I/O error reading {target}: {source}")]
    Io {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a readable DICOM object.
    #[error("failed to parse DICOM file {target}: {source}")]
    Dicom {
        target: String,
        #[source]
        source: Box<dicom_object::ReadError>,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, IngestError>;
