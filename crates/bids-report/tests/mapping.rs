use std::fs;

use bids_model::{
    AcquisitionTimestamp, Classification, ClassifiedRecord, HeaderValues, MappingRow,
    MappingTable, PhysioFiles, RuleRef, SemanticType, SeriesLocator, SeriesRecord,
};
use bids_report::{ReportError, read_mapping_table, write_mapping_rows, write_mapping_table};
use tempfile::TempDir;

fn sample_table() -> MappingTable {
    let series = SeriesRecord {
        locator: SeriesLocator::new("p1/s1/mr_0004"),
        patient_id: "P001".to_string(),
        acquisition: AcquisitionTimestamp::parse("20200101_120000"),
        headers: HeaderValues::new(),
        physio: PhysioFiles {
            respiratory: Some("p1/s1/realtime/Resp_scan_0004.1D".to_string()),
            cardiac: None,
        },
    };
    let mut func = ClassifiedRecord::new(
        series.clone(),
        Classification {
            semantic_type: SemanticType::Func,
            modality: "bold".to_string(),
            task: Some("rest".to_string()),
            acq: None,
            rec: None,
            rule: RuleRef {
                semantic_type: SemanticType::Func,
                index: 1,
            },
        },
    );
    func.subject_id = Some("sub-01".to_string());
    func.session_id = Some("ses-01".to_string());
    func.run_id = Some("run-01".to_string());

    let mut anat_series = series;
    anat_series.locator = SeriesLocator::new("p1/s1/mr_0002");
    anat_series.physio = PhysioFiles::default();
    let mut anat = ClassifiedRecord::new(
        anat_series,
        Classification {
            semantic_type: SemanticType::Anat,
            modality: "T1w".to_string(),
            task: None,
            acq: Some("mprage".to_string()),
            rec: None,
            rule: RuleRef {
                semantic_type: SemanticType::Anat,
                index: 0,
            },
        },
    );
    anat.subject_id = Some("sub-01".to_string());
    anat.session_id = Some("ses-01".to_string());
    anat.run_id = Some("run-01".to_string());

    MappingTable::from_sorted(vec![anat, func])
}

#[test]
fn mapping_table_format() {
    let mut buffer = Vec::new();
    write_mapping_rows(&mut buffer, &sample_table().rows()).expect("write rows");
    let text = String::from_utf8(buffer).expect("utf8");
    insta::assert_snapshot!(text, @r"
    subject,session,bids_type,task,acq,rec,run,modality,patient_id,scan_datetime,scan_dir,resp_physio,cardiac_physio
    sub-01,ses-01,anat,,acq-mprage,,run-01,T1w,P001,20200101_120000,p1/s1/mr_0002,,
    sub-01,ses-01,func,task-rest,,,run-01,bold,P001,20200101_120000,p1/s1/mr_0004,p1/s1/realtime/Resp_scan_0004.1D,
    ");
}

#[test]
fn written_file_reads_back() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("nested").join("bids_map.csv");
    let table = sample_table();

    let written = write_mapping_table(&path, &table).expect("write table");
    assert_eq!(written, 2);

    let rows = read_mapping_table(&path).expect("read table");
    assert_eq!(rows, table.rows());
}

#[test]
fn reordered_columns_are_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("bad.csv");
    let mut header: Vec<&str> = MappingRow::COLUMNS.to_vec();
    header.swap(0, 1);
    fs::write(&path, format!("{}\n", header.join(","))).expect("write file");

    let err = read_mapping_table(&path).expect_err("column order");
    assert!(matches!(err, ReportError::Columns { .. }));
}
