//! The header-reader capability.

use std::collections::BTreeSet;

use bids_model::{FieldSpec, HeaderField, HeaderValues, TagDictionary};

use crate::error::ReadError;
use crate::source::SeriesSource;

/// Reads header values for a series.
///
/// Implementations are shared across classification workers.
pub trait HeaderReader: Send + Sync {
    /// Value of the first tag in `spec` that is present, or `None`.
    fn read_field(&self, series: &SeriesSource, spec: &FieldSpec)
    -> Result<Option<String>, ReadError>;

    /// Reads every field in `fields`. Absent fields are left out.
    fn read_fields(
        &self,
        series: &SeriesSource,
        tags: &TagDictionary,
        fields: &BTreeSet<HeaderField>,
    ) -> Result<HeaderValues, ReadError> {
        let mut values = HeaderValues::new();
        for field in fields {
            let spec = tags.spec(field)?;
            if let Some(value) = self.read_field(series, spec)? {
                values.insert(field.clone(), value);
            }
        }
        Ok(values)
    }
}
