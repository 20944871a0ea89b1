//! Identifier assignment.
//!
//! Subjects, sessions and runs are numbered over the complete set of
//! classified records:
//!
//! - subjects in order of first appearance of each patient id,
//! - sessions chronologically per subject,
//! - runs per `(task, acq, rec, modality)` group within a session.
//!
//! Each level pads its numbers to `digits(count) + 1` (never less than two)
//! where `count` is the number of ids issued at that level only, so a
//! subject with fifteen sessions gets `ses-015` while the subjects
//! themselves stay at `sub-01`.
//!
//! Records are first put into a canonical order (acquisition time, then
//! locator) so the result does not depend on the order in which series were
//! discovered or classified.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use bids_model::{AcquisitionTimestamp, ClassifiedRecord, MappingTable};

use crate::error::AssignError;

const MIN_PAD_WIDTH: usize = 2;

/// Zero-pad width for a level that issues `count` ids.
pub fn pad_width(count: usize) -> usize {
    let digits = count.max(1).to_string().len();
    (digits + 1).max(MIN_PAD_WIDTH)
}

fn format_id(prefix: &str, index: usize, width: usize) -> String {
    format!("{prefix}-{index:0width$}")
}

/// Assigns subject, session and run ids and returns the sorted table.
pub fn assign(mut records: Vec<ClassifiedRecord>) -> Result<MappingTable, AssignError> {
    for record in &records {
        if record.series.patient_id.trim().is_empty() {
            return Err(AssignError::MissingPatientId {
                locator: record.series.locator.to_string(),
            });
        }
        if record.classification.modality.trim().is_empty() {
            return Err(AssignError::MissingModality {
                locator: record.series.locator.to_string(),
            });
        }
    }
    if records.is_empty() {
        return Ok(MappingTable::default());
    }

    records.sort_by(|a, b| {
        a.series
            .acquisition
            .cmp(&b.series.acquisition)
            .then_with(|| a.series.locator.cmp(&b.series.locator))
            .then_with(|| a.series.patient_id.cmp(&b.series.patient_id))
    });

    let subjects = number_subjects(&records);
    let subject_count = subjects.len();
    let subject_width = pad_width(subject_count);

    let mut stamps: BTreeMap<&str, BTreeSet<&AcquisitionTimestamp>> = BTreeMap::new();
    for record in &records {
        stamps
            .entry(record.series.patient_id.as_str())
            .or_default()
            .insert(&record.series.acquisition);
    }
    let sessions: BTreeMap<&str, Vec<&AcquisitionTimestamp>> = stamps
        .into_iter()
        .map(|(patient, set)| (patient, set.into_iter().collect()))
        .collect();

    let mut subject_ids = Vec::with_capacity(records.len());
    let mut session_ids = Vec::with_capacity(records.len());
    for record in &records {
        let patient = record.series.patient_id.as_str();
        let subject = subjects.get(patient).copied().unwrap_or_default();
        subject_ids.push(format_id("sub", subject, subject_width));

        let ordered = sessions.get(patient).map(Vec::as_slice).unwrap_or_default();
        let session = ordered
            .iter()
            .position(|stamp| *stamp == &record.series.acquisition)
            .map_or(0, |index| index + 1);
        session_ids.push(format_id("ses", session, pad_width(ordered.len())));
    }

    let run_ids = number_runs(&records, &subject_ids, &session_ids);

    for (((record, subject), session), run) in records
        .iter_mut()
        .zip(subject_ids)
        .zip(session_ids)
        .zip(run_ids)
    {
        record.subject_id = Some(subject);
        record.session_id = Some(session);
        record.run_id = Some(run);
    }

    records.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    debug!(
        records = records.len(),
        subjects = subject_count,
        "assigned identifiers"
    );
    Ok(MappingTable::from_sorted(records))
}

/// 1-based subject number per patient id, by first appearance.
fn number_subjects(records: &[ClassifiedRecord]) -> BTreeMap<&str, usize> {
    let mut subjects = BTreeMap::new();
    for record in records {
        let next = subjects.len() + 1;
        subjects
            .entry(record.series.patient_id.as_str())
            .or_insert(next);
    }
    subjects
}

fn number_runs(
    records: &[ClassifiedRecord],
    subject_ids: &[String],
    session_ids: &[String],
) -> Vec<String> {
    type GroupKey<'a> = (&'a str, &'a str, (&'a str, &'a str, &'a str, &'a str));

    let mut groups: BTreeMap<GroupKey<'_>, Vec<usize>> = BTreeMap::new();
    for (index, record) in records.iter().enumerate() {
        let key = (
            subject_ids[index].as_str(),
            session_ids[index].as_str(),
            record.run_group_key(),
        );
        groups.entry(key).or_default().push(index);
    }

    let mut run_ids = vec![String::new(); records.len()];
    for members in groups.values() {
        let width = pad_width(members.len());
        for (position, &index) in members.iter().enumerate() {
            run_ids[index] = format_id("run", position + 1, width);
        }
    }
    run_ids
}

fn sort_key(record: &ClassifiedRecord) -> (&str, &str, &str, &str, &str) {
    (
        record.subject_id.as_deref().unwrap_or(""),
        record.session_id.as_deref().unwrap_or(""),
        record.classification.task.as_deref().unwrap_or(""),
        record.classification.modality.as_str(),
        record.run_id.as_deref().unwrap_or(""),
    )
}
