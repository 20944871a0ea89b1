use std::collections::{BTreeMap, BTreeSet};

use bids_core::{AssignError, assign};
use bids_model::{
    AcquisitionTimestamp, Classification, ClassifiedRecord, HeaderValues, PhysioFiles, RuleRef,
    SemanticType, SeriesLocator, SeriesRecord,
};
use proptest::prelude::*;

fn record(
    locator: &str,
    patient: &str,
    stamp: &str,
    semantic_type: SemanticType,
    modality: &str,
    task: Option<&str>,
) -> ClassifiedRecord {
    let series = SeriesRecord {
        locator: SeriesLocator::new(locator),
        patient_id: patient.to_string(),
        acquisition: AcquisitionTimestamp::parse(stamp),
        headers: HeaderValues::new(),
        physio: PhysioFiles::default(),
    };
    let classification = Classification {
        semantic_type,
        modality: modality.to_string(),
        task: task.map(str::to_string),
        acq: None,
        rec: None,
        rule: RuleRef {
            semantic_type,
            index: 0,
        },
    };
    ClassifiedRecord::new(series, classification)
}

#[test]
fn anat_and_func_in_one_session() {
    let table = assign(vec![
        record("p1/mr_1", "P1", "20200101_1200", SemanticType::Anat, "T1w", None),
        record(
            "p1/mr_2",
            "P1",
            "20200101_1200",
            SemanticType::Func,
            "bold",
            Some("rest"),
        ),
    ])
    .expect("assign");

    let rows = table.rows();
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(row.subject, "sub-01");
        assert_eq!(row.session, "ses-01");
        assert_eq!(row.run, "run-01");
    }
    assert_eq!(rows[0].modality, "T1w");
    assert_eq!(rows[0].task, "");
    assert_eq!(rows[1].modality, "bold");
    assert_eq!(rows[1].task, "task-rest");
}

#[test]
fn padding_is_computed_per_level() {
    let mut records = Vec::new();
    for day in 1..=15 {
        records.push(record(
            &format!("p1/day_{day}"),
            "P1",
            &format!("202001{day:02}_0900"),
            SemanticType::Anat,
            "T1w",
            None,
        ));
    }
    records.push(record("p2/a", "P2", "20200101_0800", SemanticType::Anat, "T1w", None));
    records.push(record("p3/a", "P3", "20200101_0700", SemanticType::Anat, "T1w", None));

    let rows = assign(records).expect("assign").rows();
    let p1: Vec<_> = rows.iter().filter(|row| row.patient_id == "P1").collect();
    assert_eq!(p1.len(), 15);
    assert!(p1.iter().all(|row| row.subject.len() == "sub-01".len()));
    assert_eq!(p1[0].session, "ses-001");
    assert_eq!(p1[14].session, "ses-015");
    assert!(p1.iter().all(|row| row.run == "run-01"));

    let p2 = rows.iter().find(|row| row.patient_id == "P2").expect("P2");
    assert_eq!(p2.session, "ses-01");
}

#[test]
fn subjects_follow_first_acquisition() {
    let rows = assign(vec![
        record("b", "LATE", "20210101_0900", SemanticType::Anat, "T1w", None),
        record("a", "EARLY", "20200101_0900", SemanticType::Anat, "T1w", None),
    ])
    .expect("assign")
    .rows();
    assert_eq!(rows[0].patient_id, "EARLY");
    assert_eq!(rows[0].subject, "sub-01");
    assert_eq!(rows[1].subject, "sub-02");
}

#[test]
fn repeated_series_get_consecutive_runs() {
    let rows = assign(vec![
        record("s/mr_12", "P1", "20200101_1200", SemanticType::Func, "bold", Some("rest")),
        record("s/mr_3", "P1", "20200101_1200", SemanticType::Func, "bold", Some("rest")),
        record("s/mr_7", "P1", "20200101_1200", SemanticType::Func, "bold", Some("motor")),
    ])
    .expect("assign")
    .rows();

    let runs: Vec<(&str, &str, &str)> = rows
        .iter()
        .map(|row| (row.task.as_str(), row.run.as_str(), row.scan_dir.as_str()))
        .collect();
    assert_eq!(
        runs,
        vec![
            ("task-motor", "run-01", "s/mr_7"),
            ("task-rest", "run-01", "s/mr_3"),
            ("task-rest", "run-02", "s/mr_12"),
        ]
    );
}

#[test]
fn blank_patient_is_an_invariant_violation() {
    let err = assign(vec![record(
        "x",
        " ",
        "20200101_1200",
        SemanticType::Anat,
        "T1w",
        None,
    )])
    .expect_err("blank patient");
    assert!(matches!(err, AssignError::MissingPatientId { .. }));
}

fn arbitrary_records() -> impl Strategy<Value = Vec<ClassifiedRecord>> {
    let patients = prop::sample::select(vec!["P1", "P2", "P3"]);
    let stamps = prop::sample::select(vec![
        "20200101_0900",
        "20200101_1300",
        "20200202_0800",
        "bad-stamp",
    ]);
    let kinds = prop::sample::select(vec![
        (SemanticType::Anat, "T1w", None),
        (SemanticType::Anat, "T2w", None),
        (SemanticType::Func, "bold", Some("rest")),
        (SemanticType::Func, "bold", Some("nback")),
    ]);
    prop::collection::vec((patients, stamps, kinds), 0..40).prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(index, (patient, stamp, (kind, modality, task)))| {
                record(
                    &format!("exam/mr_{index}"),
                    patient,
                    stamp,
                    kind,
                    modality,
                    task,
                )
            })
            .collect()
    })
}

/// The same records twice, the second copy in a random order.
fn shuffled_records() -> impl Strategy<Value = (Vec<ClassifiedRecord>, Vec<ClassifiedRecord>)> {
    arbitrary_records()
        .prop_flat_map(|records| (Just(records.clone()), Just(records).prop_shuffle()))
}

proptest! {
    #[test]
    fn identifiers_are_unique_and_contiguous(records in arbitrary_records()) {
        let rows = assign(records.clone()).expect("assign").rows();
        prop_assert_eq!(rows.len(), records.len());

        let mut subject_of: BTreeMap<&str, &str> = BTreeMap::new();
        let mut patient_of: BTreeMap<&str, &str> = BTreeMap::new();
        for row in &rows {
            prop_assert_eq!(*subject_of.entry(&row.patient_id).or_insert(&row.subject), row.subject.as_str());
            prop_assert_eq!(*patient_of.entry(&row.subject).or_insert(&row.patient_id), row.patient_id.as_str());
        }

        let mut groups: BTreeMap<(&str, &str, &str, &str, &str, &str), Vec<&str>> = BTreeMap::new();
        for row in &rows {
            groups
                .entry((
                    row.subject.as_str(),
                    row.session.as_str(),
                    row.task.as_str(),
                    row.acq.as_str(),
                    row.rec.as_str(),
                    row.modality.as_str(),
                ))
                .or_default()
                .push(row.run.as_str());
        }
        for runs in groups.values() {
            let width = bids_core::pad_width(runs.len());
            let expected: BTreeSet<String> =
                (1..=runs.len()).map(|n| format!("run-{n:0width$}")).collect();
            let actual: BTreeSet<String> = runs.iter().map(|run| (*run).to_string()).collect();
            prop_assert_eq!(actual.len(), runs.len());
            prop_assert_eq!(actual, expected);
        }
    }

    #[test]
    fn output_ignores_input_order((records, shuffled) in shuffled_records()) {
        let original = assign(records).expect("assign").rows();
        let reordered = assign(shuffled).expect("assign").rows();
        prop_assert_eq!(original, reordered);
    }
}
