//! Mapping table reader and writer.
//!
//! The file is comma-separated with a header row. Column order is fixed
//! (see [`MappingRow::COLUMNS`]) and absent values are empty strings.

use std::fs;
use std::io::Write;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use tracing::debug;

use bids_model::{MappingRow, MappingTable};

use crate::error::ReportError;

/// Writes the header row and `rows` to `writer`.
pub fn write_mapping_rows<W: Write>(writer: W, rows: &[MappingRow]) -> Result<(), csv::Error> {
    let mut csv = WriterBuilder::new().has_headers(false).from_writer(writer);
    csv.write_record(MappingRow::COLUMNS)?;
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes `table` to `path`, creating parent directories. Returns the
/// number of rows written.
pub fn write_mapping_table(path: &Path, table: &MappingTable) -> Result<usize, ReportError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ReportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = fs::File::create(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let rows = table.rows();
    write_mapping_rows(file, &rows).map_err(|source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(rows.len())
}

/// Reads a mapping table, rejecting files whose header differs from the
/// fixed column layout.
pub fn read_mapping_table(path: &Path) -> Result<Vec<MappingRow>, ReportError> {
    let csv_error = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(csv_error)?;
    let found: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|header| header.trim_matches('\u{feff}').trim().to_string())
        .collect();
    if found != MappingRow::COLUMNS {
        return Err(ReportError::Columns {
            path: path.to_path_buf(),
            expected: MappingRow::COLUMNS.join(", "),
            found: found.join(", "),
        });
    }

    let rows = reader
        .deserialize::<MappingRow>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_error)?;
    debug!(path = %path.display(), rows = rows.len(), "read mapping table");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_still_has_header() {
        let mut buffer = Vec::new();
        write_mapping_rows(&mut buffer, &[]).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text,
            "subject,session,bids_type,task,acq,rec,run,modality,patient_id,scan_datetime,scan_dir,resp_physio,cardiac_physio\n"
        );
    }
}
