use bids_model::{
    AcquisitionTimestamp, Classification, ClassifiedRecord, HeaderValues, MappingRow, PhysioFiles,
    RuleRef, SemanticType, SeriesLocator, SeriesRecord,
};

fn functional_record() -> ClassifiedRecord {
    let series = SeriesRecord {
        locator: SeriesLocator::new("exam1/series_004"),
        patient_id: "P001".to_string(),
        acquisition: AcquisitionTimestamp::new("20200101", "120000"),
        headers: HeaderValues::new(),
        physio: PhysioFiles {
            respiratory: Some("exam1/physio/resp_004.log".to_string()),
            cardiac: None,
        },
    };
    let classification = Classification {
        semantic_type: SemanticType::Func,
        modality: "bold".to_string(),
        task: Some("rest".to_string()),
        acq: None,
        rec: Some("norm".to_string()),
        rule: RuleRef {
            semantic_type: SemanticType::Func,
            index: 0,
        },
    };
    ClassifiedRecord::new(series, classification)
}

#[test]
fn row_uses_entity_prefixes() {
    let mut record = functional_record();
    record.subject_id = Some("01".to_string());
    record.session_id = Some("01".to_string());
    record.run_id = Some("01".to_string());

    let row = record.to_row();
    assert_eq!(row.bids_type, "func");
    assert_eq!(row.task, "task-rest");
    assert_eq!(row.acq, "");
    assert_eq!(row.rec, "rec-norm");
    assert_eq!(row.scan_datetime, "20200101_120000");
    assert_eq!(row.scan_dir, "exam1/series_004");
    assert_eq!(row.resp_physio, "exam1/physio/resp_004.log");
    assert_eq!(row.cardiac_physio, "");
}

#[test]
fn unassigned_record_leaves_identifiers_empty() {
    let row = functional_record().to_row();
    assert_eq!(row.subject, "");
    assert_eq!(row.session, "");
    assert_eq!(row.run, "");
}

#[test]
fn row_serializes_in_column_order() {
    let row = functional_record().to_row();
    let json = serde_json::to_value(&row).expect("serialize row");
    let keys: Vec<&str> = json
        .as_object()
        .expect("row object")
        .keys()
        .map(String::as_str)
        .collect();
    let mut expected = MappingRow::COLUMNS.to_vec();
    expected.sort_unstable();
    let mut sorted = keys.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, expected);
}
