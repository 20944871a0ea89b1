//! In-process header reader built on `dicom-object`.
//!
//! Only the data set up to Pixel Data is parsed. Archived representatives are
//! parsed from the bytes extracted during discovery.

use std::collections::BTreeSet;
use std::time::Instant;

use dicom_core::{Tag, VR};
use dicom_dictionary_std::tags;
use dicom_object::{DefaultDicomObject, OpenFileOptions};
use tracing::debug;

use bids_model::{DicomTag, FieldSpec, HeaderField, HeaderValues, TagDictionary};

use crate::error::ReadError;
use crate::reader::HeaderReader;
use crate::source::{Representative, SeriesSource};

const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";

/// Default header reader for `map`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DicomReader;

impl DicomReader {
    pub fn new() -> Self {
        Self
    }

    fn open(&self, series: &SeriesSource) -> Result<DefaultDicomObject, ReadError> {
        let representative = series.representative.as_ref().ok_or_else(|| {
            ReadError::MissingRepresentative {
                locator: series.locator.to_string(),
            }
        })?;
        let options = OpenFileOptions::new().read_until(tags::PIXEL_DATA);
        let opened = match representative {
            Representative::File(path) => options.open_file(path),
            Representative::Archived(file) => options.from_reader(without_preamble(&file.bytes)),
        };
        opened.map_err(|source| ReadError::Dicom {
            target: representative.to_string(),
            source: Box::new(source),
        })
    }
}

impl HeaderReader for DicomReader {
    fn read_field(
        &self,
        series: &SeriesSource,
        spec: &FieldSpec,
    ) -> Result<Option<String>, ReadError> {
        let object = self.open(series)?;
        Ok(first_present(&object, spec))
    }

    /// Parses the file once for every requested field.
    fn read_fields(
        &self,
        series: &SeriesSource,
        tags: &TagDictionary,
        fields: &BTreeSet<HeaderField>,
    ) -> Result<HeaderValues, ReadError> {
        let started = Instant::now();
        let object = self.open(series)?;

        let mut values = HeaderValues::new();
        for field in fields {
            if let Some(value) = first_present(&object, tags.spec(field)?) {
                values.insert(field.clone(), value);
            }
        }
        debug!(
            locator = %series.locator,
            fields = values.len(),
            duration_ms = started.elapsed().as_millis(),
            "read DICOM header"
        );
        Ok(values)
    }
}

fn first_present(object: &DefaultDicomObject, spec: &FieldSpec) -> Option<String> {
    spec.tags().iter().find_map(|tag| element_text(object, *tag))
}

/// Text of one element. Multi-valued elements keep the backslash-separated
/// form; unknown-VR elements are decoded as text.
fn element_text(object: &DefaultDicomObject, tag: DicomTag) -> Option<String> {
    let element = object
        .element_opt(Tag(tag.group, tag.element))
        .ok()
        .flatten()?;
    let text = if element.vr() == VR::UN {
        String::from_utf8_lossy(&element.to_bytes().ok()?).into_owned()
    } else {
        element.to_str().ok()?.into_owned()
    };
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    (!text.is_empty()).then(|| text.to_string())
}

/// Skips the 128-byte preamble so the reader starts at the `DICM` magic.
fn without_preamble(bytes: &[u8]) -> &[u8] {
    match bytes.get(PREAMBLE_LEN..PREAMBLE_LEN + MAGIC.len()) {
        Some(magic) if magic == MAGIC => &bytes[PREAMBLE_LEN..],
        _ => bytes,
    }
}
