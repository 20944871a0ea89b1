//! Header table: a CSV exported ahead of time with one row per series.
//!
//! The `scan_dir` column names the series. Other columns are either header
//! field names (`series_description`, `patient_id`, ...) or DICOM tags
//! written `gggg,eeee`. `resp_physio` and `cardiac_physio` are optional.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::str::FromStr;

use csv::ReaderBuilder;
use tracing::debug;

use bids_model::{
    DicomTag, FieldSpec, HeaderField, HeaderValues, PhysioFiles, SeriesLocator, TagDictionary,
};

use crate::error::{IngestError, ReadError, Result};
use crate::reader::HeaderReader;
use crate::source::SeriesSource;

pub const LOCATOR_COLUMN: &str = "scan_dir";
const RESPIRATORY_COLUMN: &str = "resp_physio";
const CARDIAC_COLUMN: &str = "cardiac_physio";

#[derive(Debug, Clone, Default)]
struct TableRow {
    by_name: BTreeMap<String, String>,
    by_tag: BTreeMap<DicomTag, String>,
    physio: PhysioFiles,
}

/// Parsed header table. Also serves as a [`HeaderReader`].
#[derive(Debug, Clone, Default)]
pub struct HeaderTable {
    rows: BTreeMap<SeriesLocator, TableRow>,
}

impl HeaderTable {
    pub fn read(path: &Path) -> Result<Self> {
        let csv_error = |source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(csv_error)?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(|header| header.trim_matches('\u{feff}').trim().to_ascii_lowercase())
            .collect();
        let Some(locator_index) = headers.iter().position(|header| header == LOCATOR_COLUMN)
        else {
            return Err(IngestError::MissingColumn {
                column: LOCATOR_COLUMN.to_string(),
                path: path.to_path_buf(),
            });
        };

        let mut rows = BTreeMap::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            let locator = record.get(locator_index).unwrap_or_default().trim();
            if locator.is_empty() {
                continue;
            }
            let mut row = TableRow::default();
            for (index, value) in record.iter().enumerate() {
                let value = value.trim();
                if index == locator_index || value.is_empty() {
                    continue;
                }
                let Some(header) = headers.get(index) else {
                    continue;
                };
                match header.as_str() {
                    RESPIRATORY_COLUMN => row.physio.respiratory = Some(value.to_string()),
                    CARDIAC_COLUMN => row.physio.cardiac = Some(value.to_string()),
                    _ => match DicomTag::from_str(header) {
                        Ok(tag) => {
                            row.by_tag.insert(tag, value.to_string());
                        }
                        Err(_) => {
                            row.by_name.insert(header.clone(), value.to_string());
                        }
                    },
                }
            }
            let locator = SeriesLocator::new(locator);
            if rows.contains_key(&locator) {
                return Err(IngestError::DuplicateSeries {
                    locator: locator.to_string(),
                    path: path.to_path_buf(),
                });
            }
            rows.insert(locator, row);
        }
        debug!(path = %path.display(), series = rows.len(), "read header table");
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every listed series, ordered by locator.
    pub fn sources(&self) -> Vec<SeriesSource> {
        self.rows
            .iter()
            .map(|(locator, row)| SeriesSource {
                locator: locator.clone(),
                representative: None,
                physio: row.physio.clone(),
            })
            .collect()
    }

    fn row(&self, series: &SeriesSource) -> std::result::Result<&TableRow, ReadError> {
        self.rows
            .get(&series.locator)
            .ok_or_else(|| ReadError::UnknownSeries {
                locator: series.locator.to_string(),
            })
    }
}

fn tag_value(row: &TableRow, spec: &FieldSpec) -> Option<String> {
    spec.tags().iter().find_map(|tag| row.by_tag.get(tag).cloned())
}

impl HeaderReader for HeaderTable {
    fn read_field(
        &self,
        series: &SeriesSource,
        spec: &FieldSpec,
    ) -> std::result::Result<Option<String>, ReadError> {
        Ok(tag_value(self.row(series)?, spec))
    }

    /// Named columns take precedence over tag columns.
    fn read_fields(
        &self,
        series: &SeriesSource,
        tags: &TagDictionary,
        fields: &BTreeSet<HeaderField>,
    ) -> std::result::Result<HeaderValues, ReadError> {
        let row = self.row(series)?;
        let mut values = HeaderValues::new();
        for field in fields {
            let value = match row.by_name.get(field.name()) {
                Some(value) => Some(value.clone()),
                None => tags.spec(field).ok().and_then(|spec| tag_value(row, spec)),
            };
            if let Some(value) = value {
                values.insert(field.clone(), value);
            }
        }
        Ok(values)
    }
}
