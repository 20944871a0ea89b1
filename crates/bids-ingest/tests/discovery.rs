use std::fs;
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

use bids_ingest::{IngestError, Representative, discover_archive, discover_series};

fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create dirs");
    }
    fs::write(path, b"").expect("write file");
}

#[test]
fn finds_one_representative_per_directory() {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();
    touch(root, "p1/s1/mr_0002/b.dcm");
    touch(root, "p1/s1/mr_0002/a.dcm");
    touch(root, "p1/s1/mr_0010/a.dcm");
    touch(root, "p1/s1/notes/readme.txt");
    touch(root, "p2/s1/mr_0001/IM1.DCM");

    let series = discover_series(root).expect("discover");
    let locators: Vec<&str> = series.iter().map(|s| s.locator.as_str()).collect();
    assert_eq!(locators, vec!["p1/s1/mr_0002", "p1/s1/mr_0010", "p2/s1/mr_0001"]);

    match &series[0].representative {
        Some(Representative::File(path)) => {
            assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("a.dcm"));
        }
        other => panic!("unexpected representative: {other:?}"),
    }
}

#[test]
fn attaches_physio_by_scan_number() {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();
    touch(root, "p1/s1/mr_0001/a.dcm");
    touch(root, "p1/s1/mr_0002/a.dcm");
    touch(root, "p1/s1/realtime/ECG_epiRT_scan_0001.1D");
    touch(root, "p1/s1/realtime/Resp_epiRT_scan_0001.1D");
    touch(root, "p1/s1/realtime/Resp_epiRT_scan_00010.1D");
    touch(root, "p1/s1/realtime/ECG_epiRT_scan_0002.txt");

    let series = discover_series(root).expect("discover");
    assert_eq!(series.len(), 2);

    let first = &series[0].physio;
    assert_eq!(
        first.cardiac.as_deref(),
        Some("p1/s1/realtime/ECG_epiRT_scan_0001.1D")
    );
    assert_eq!(
        first.respiratory.as_deref(),
        Some("p1/s1/realtime/Resp_epiRT_scan_0001.1D")
    );

    let second = &series[1].physio;
    assert_eq!(second.cardiac, None);
    assert_eq!(second.respiratory, None);
}

#[test]
fn missing_root_is_an_error() {
    let dir = TempDir::new().expect("temp dir");
    let err = discover_series(&dir.path().join("absent")).expect_err("missing root");
    assert!(matches!(err, IngestError::DirectoryNotFound { .. }));
}

/// Writes a gzip-compressed tar holding `members` in the given order.
fn tgz(path: &Path, members: &[(&str, &str)]) {
    let file = fs::File::create(path).expect("create archive");
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (name, contents) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, name, contents.as_bytes())
            .expect("append member");
    }
    builder
        .into_inner()
        .expect("finish tar")
        .finish()
        .expect("finish gzip");
}

#[test]
fn lists_archived_series_with_physio() {
    let dir = TempDir::new().expect("temp dir");
    let archive = dir.path().join("p1-s1-DICOM.tgz");
    tgz(
        &archive,
        &[
            ("p1/s1/mr_0002/0002.dcm", "second"),
            ("p1/s1/mr_0002/0001.dcm", "first"),
            ("p1/s1/mr_0001/0001.dcm", "scout"),
            ("p1/s1/realtime/ECG_epiRT_scan_0002.1D", "1 2 3"),
            ("p1/s1/realtime/Resp_epiRT_scan_00020.1D", "4 5 6"),
            ("p1/s1/notes.txt", "ignored"),
        ],
    );

    let series = discover_archive(&archive).expect("list archive");
    let locators: Vec<&str> = series.iter().map(|s| s.locator.as_str()).collect();
    assert_eq!(locators, vec!["p1/s1/mr_0001", "p1/s1/mr_0002"]);

    match &series[1].representative {
        Some(Representative::Archived(file)) => {
            assert_eq!(file.archive, archive);
            assert_eq!(file.member, "p1/s1/mr_0002/0002.dcm");
            assert_eq!(&file.bytes[..], b"second");
        }
        other => panic!("unexpected representative: {other:?}"),
    }
    assert_eq!(
        series[1].physio.cardiac.as_deref(),
        Some("p1/s1/realtime/ECG_epiRT_scan_0002.1D")
    );
    assert_eq!(series[1].physio.respiratory, None);
    assert_eq!(series[0].physio.cardiac, None);
}

#[test]
fn archives_are_listed_before_plain_directories() {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();
    tgz(&root.join("p2-s1-DICOM.tgz"), &[("p2/s1/mr_0001/a.dcm", "x")]);
    touch(root, "p1/s1/mr_0001/a.dcm");

    let series = discover_series(root).expect("discover");
    let locators: Vec<&str> = series.iter().map(|s| s.locator.as_str()).collect();
    assert_eq!(locators, vec!["p2/s1/mr_0001", "p1/s1/mr_0001"]);
    assert!(matches!(
        series[0].representative,
        Some(Representative::Archived(_))
    ));
    assert!(matches!(series[1].representative, Some(Representative::File(_))));
}

#[test]
fn unreadable_archive_is_left_out() {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();
    fs::write(root.join("broken.tgz"), b"not gzip").expect("write archive");
    touch(root, "p1/s1/mr_0001/a.dcm");

    let err = discover_archive(&root.join("broken.tgz")).expect_err("corrupt archive");
    assert!(matches!(err, IngestError::Archive { .. }));

    let series = discover_series(root).expect("discover");
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].locator.as_str(), "p1/s1/mr_0001");
}
