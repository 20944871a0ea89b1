pub mod archive;
pub mod dcmdump;
pub mod dicom;
pub mod discovery;
pub mod error;
pub mod reader;
pub mod source;
pub mod table;

pub use archive::{ARCHIVE_EXTENSION, discover_archive};
pub use dcmdump::{DcmdumpReader, parse_dump};
pub use dicom::DicomReader;
pub use discovery::discover_series;
pub use error::{IngestError, ReadError, Result};
pub use reader::HeaderReader;
pub use source::{ArchivedFile, Representative, SeriesSource};
pub use table::HeaderTable;
