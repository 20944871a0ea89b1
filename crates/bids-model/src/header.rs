//! Header fields and the DICOM tags that back them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ModelError, Result};

/// A single DICOM data element address, written `gggg,eeee`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DicomTag {
    pub group: u16,
    pub element: u16,
}

impl DicomTag {
    pub const fn new(group: u16, element: u16) -> Self {
        Self { group, element }
    }
}

impl FromStr for DicomTag {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split(',').collect();
        let [group, element] = parts.as_slice() else {
            return Err(ModelError::TagShape(raw.to_string()));
        };
        let parse = |part: &str| {
            let part = part.trim();
            let digits = part
                .strip_prefix("0x")
                .or_else(|| part.strip_prefix("0X"))
                .unwrap_or(part);
            u16::from_str_radix(digits, 16).map_err(|_| ModelError::TagHex {
                tag: raw.to_string(),
                part: part.to_string(),
            })
        };
        Ok(Self {
            group: parse(*group)?,
            element: parse(*element)?,
        })
    }
}

impl fmt::Display for DicomTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X},{:04X}", self.group, self.element)
    }
}

impl Serialize for DicomTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DicomTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Ordered fallback list of tags; the first tag with a value wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    tags: Vec<DicomTag>,
}

impl FieldSpec {
    pub fn new(tags: Vec<DicomTag>) -> Option<Self> {
        if tags.is_empty() {
            None
        } else {
            Some(Self { tags })
        }
    }

    pub fn single(tag: DicomTag) -> Self {
        Self { tags: vec![tag] }
    }

    pub fn tags(&self) -> &[DicomTag] {
        &self.tags
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.tags.iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join(" | "))
    }
}

/// Metadata fields a rule (or the record builder) can inspect.
///
/// The built-in variants cover what the default heuristics and the identity
/// columns need. `Custom` fields exist only when a configuration declares a
/// tag specification for them, which keeps rule field names a closed set per
/// loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeaderField {
    SeriesDescription,
    SequenceName,
    ProtocolName,
    ImageType,
    PatientId,
    StudyDate,
    StudyTime,
    Custom(String),
}

impl HeaderField {
    /// Fields every series must provide to become a record.
    pub const IDENTITY: [HeaderField; 3] = [
        HeaderField::PatientId,
        HeaderField::StudyDate,
        HeaderField::StudyTime,
    ];

    /// Resolves a built-in field name. Custom names are resolved through
    /// [`TagDictionary::field`].
    pub fn builtin(name: &str) -> Option<Self> {
        let field = match name.trim().to_ascii_lowercase().as_str() {
            "series_description" => Self::SeriesDescription,
            "sequence_name" => Self::SequenceName,
            "protocol_name" => Self::ProtocolName,
            "image_type" => Self::ImageType,
            "patient_id" => Self::PatientId,
            "study_date" => Self::StudyDate,
            "study_time" => Self::StudyTime,
            _ => return None,
        };
        Some(field)
    }

    pub fn name(&self) -> &str {
        match self {
            Self::SeriesDescription => "series_description",
            Self::SequenceName => "sequence_name",
            Self::ProtocolName => "protocol_name",
            Self::ImageType => "image_type",
            Self::PatientId => "patient_id",
            Self::StudyDate => "study_date",
            Self::StudyTime => "study_time",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for HeaderField {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Maps each known header field to its tag specification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDictionary {
    specs: BTreeMap<HeaderField, FieldSpec>,
}

impl TagDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the spec for a field name. Unknown names
    /// become [`HeaderField::Custom`].
    pub fn insert(&mut self, name: &str, spec: FieldSpec) -> HeaderField {
        let name = name.trim();
        let field = HeaderField::builtin(name)
            .unwrap_or_else(|| HeaderField::Custom(name.to_ascii_lowercase()));
        self.specs.insert(field.clone(), spec);
        field
    }

    /// Resolves a field name used in a rule. Fails for names that are
    /// neither built in nor declared.
    pub fn field(&self, name: &str) -> Result<HeaderField> {
        if let Some(field) = HeaderField::builtin(name) {
            return Ok(field);
        }
        let custom = HeaderField::Custom(name.trim().to_ascii_lowercase());
        if self.specs.contains_key(&custom) {
            Ok(custom)
        } else {
            Err(ModelError::UnknownHeaderField(name.to_string()))
        }
    }

    pub fn spec(&self, field: &HeaderField) -> Result<&FieldSpec> {
        self.specs
            .get(field)
            .ok_or_else(|| ModelError::MissingFieldSpec(field.name().to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderField, &FieldSpec)> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Raw header values read for one series. Absent fields have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderValues {
    values: BTreeMap<HeaderField, String>,
}

impl HeaderValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value; blank values are treated as absent.
    pub fn insert(&mut self, field: HeaderField, value: impl Into<String>) {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.values.remove(&field);
        } else {
            self.values.insert(field, trimmed.to_string());
        }
    }

    pub fn get(&self, field: &HeaderField) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(HeaderField, String)> for HeaderValues {
    fn from_iter<I: IntoIterator<Item = (HeaderField, String)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (field, value) in iter {
            values.insert(field, value);
        }
        values
    }
}
