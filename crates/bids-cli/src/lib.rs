//! Command-line front end for the DICOM-to-BIDS mapper.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
pub mod types;
