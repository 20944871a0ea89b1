//! Mapping table output for the DICOM-to-BIDS mapper.

pub mod error;
pub mod mapping;

pub use error::ReportError;
pub use mapping::{read_mapping_table, write_mapping_rows, write_mapping_table};
