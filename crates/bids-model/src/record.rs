//! Series records as they move from discovery through assignment.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::header::HeaderValues;
use crate::labels::natural_cmp;
use crate::rule::{RuleRef, SemanticType};

/// Opaque series handle: a directory relative to the DICOM root, or an
/// archive-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesLocator(String);

impl SeriesLocator {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialOrd for SeriesLocator {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders `scan_9` before `scan_10`.
impl Ord for SeriesLocator {
    fn cmp(&self, other: &Self) -> Ordering {
        natural_cmp(&self.0, &other.0)
    }
}

/// `{StudyDate}_{StudyTime}` as read from the header, with a parsed form
/// used for chronological ordering when the text is well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AcquisitionTimestamp {
    raw: String,
    parsed: Option<NaiveDateTime>,
}

impl AcquisitionTimestamp {
    pub fn new(date: &str, time: &str) -> Self {
        Self::parse(&format!("{}_{}", date.trim(), time.trim()))
    }

    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_string();
        let parsed = raw
            .split_once('_')
            .and_then(|(date, time)| parse_date_time(date, time));
        Self { raw, parsed }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn parsed(&self) -> Option<NaiveDateTime> {
        self.parsed
    }
}

fn parse_date_time(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date, "%Y%m%d").ok()?;
    let time = ["%H%M%S%.f", "%H%M%S", "%H%M"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(time, format).ok())?;
    Some(date.and_time(time))
}

impl fmt::Display for AcquisitionTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialOrd for AcquisitionTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Parsed stamps first, chronologically; unparsable stamps after, by text.
impl Ord for AcquisitionTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.parsed, other.parsed) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.raw.cmp(&other.raw)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.raw.cmp(&other.raw),
        }
    }
}

/// Physiological trace files recorded alongside a series.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhysioFiles {
    pub respiratory: Option<String>,
    pub cardiac: Option<String>,
}

/// One physical scan series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRecord {
    pub locator: SeriesLocator,
    pub patient_id: String,
    pub acquisition: AcquisitionTimestamp,
    pub headers: HeaderValues,
    pub physio: PhysioFiles,
}

/// Labels produced by the rule that matched a series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub semantic_type: SemanticType,
    pub modality: String,
    /// Set only for functional series.
    pub task: Option<String>,
    pub acq: Option<String>,
    pub rec: Option<String>,
    pub rule: RuleRef,
}

/// A classified series. The identifier fields stay empty until the
/// assigner runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRecord {
    pub series: SeriesRecord,
    pub classification: Classification,
    pub subject_id: Option<String>,
    pub session_id: Option<String>,
    pub run_id: Option<String>,
}

impl ClassifiedRecord {
    pub fn new(series: SeriesRecord, classification: Classification) -> Self {
        Self {
            series,
            classification,
            subject_id: None,
            session_id: None,
            run_id: None,
        }
    }

    /// Key records must share to be numbered as runs of one another.
    pub fn run_group_key(&self) -> (&str, &str, &str, &str) {
        let class = &self.classification;
        (
            class.task.as_deref().unwrap_or(""),
            class.acq.as_deref().unwrap_or(""),
            class.rec.as_deref().unwrap_or(""),
            class.modality.as_str(),
        )
    }

    /// Flattens the record into the mapping-table column layout.
    pub fn to_row(&self) -> MappingRow {
        let class = &self.classification;
        MappingRow {
            subject: self.subject_id.clone().unwrap_or_default(),
            session: self.session_id.clone().unwrap_or_default(),
            bids_type: class.semantic_type.to_string(),
            task: entity("task", class.task.as_deref()),
            acq: entity("acq", class.acq.as_deref()),
            rec: entity("rec", class.rec.as_deref()),
            run: self.run_id.clone().unwrap_or_default(),
            modality: class.modality.clone(),
            patient_id: self.series.patient_id.clone(),
            scan_datetime: self.series.acquisition.to_string(),
            scan_dir: self.series.locator.to_string(),
            resp_physio: self.series.physio.respiratory.clone().unwrap_or_default(),
            cardiac_physio: self.series.physio.cardiac.clone().unwrap_or_default(),
        }
    }
}

fn entity(key: &str, label: Option<&str>) -> String {
    match label {
        Some(label) if !label.is_empty() => format!("{key}-{label}"),
        _ => String::new(),
    }
}

/// One row of the mapping table. Field order is the column order of the
/// file format; absent values are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MappingRow {
    pub subject: String,
    pub session: String,
    pub bids_type: String,
    pub task: String,
    pub acq: String,
    pub rec: String,
    pub run: String,
    pub modality: String,
    pub patient_id: String,
    pub scan_datetime: String,
    pub scan_dir: String,
    pub resp_physio: String,
    pub cardiac_physio: String,
}

impl MappingRow {
    pub const COLUMNS: [&'static str; 13] = [
        "subject",
        "session",
        "bids_type",
        "task",
        "acq",
        "rec",
        "run",
        "modality",
        "patient_id",
        "scan_datetime",
        "scan_dir",
        "resp_physio",
        "cardiac_physio",
    ];
}

/// Classified records after identifier assignment, in final sort order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    records: Vec<ClassifiedRecord>,
}

impl MappingTable {
    /// Wraps records that are already assigned and sorted.
    pub fn from_sorted(records: Vec<ClassifiedRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ClassifiedRecord] {
        &self.records
    }

    pub fn rows(&self) -> Vec<MappingRow> {
        self.records.iter().map(ClassifiedRecord::to_row).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_order_chronologically() {
        let morning = AcquisitionTimestamp::parse("20200102_0930");
        let evening = AcquisitionTimestamp::parse("20200101_183000.5");
        let broken = AcquisitionTimestamp::parse("unknown");
        assert!(evening < morning);
        assert!(morning < broken);
        assert_eq!(evening.to_string(), "20200101_183000.5");
        assert!(broken.parsed().is_none());
    }

    #[test]
    fn timestamp_from_parts_trims() {
        let stamp = AcquisitionTimestamp::new(" 20200101", "120000 ");
        assert_eq!(stamp.as_str(), "20200101_120000");
        assert!(stamp.parsed().is_some());
    }

    #[test]
    fn locators_sort_naturally() {
        let mut locators = vec![
            SeriesLocator::new("exam/mr_0010"),
            SeriesLocator::new("exam/mr_9"),
            SeriesLocator::new("exam/mr_0002"),
        ];
        locators.sort();
        let ordered: Vec<&str> = locators.iter().map(SeriesLocator::as_str).collect();
        assert_eq!(ordered, vec!["exam/mr_0002", "exam/mr_9", "exam/mr_0010"]);
    }
}
