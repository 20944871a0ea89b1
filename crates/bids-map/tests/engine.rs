use bids_map::{Matcher, UNSPECIFIED_TASK};
use bids_model::{
    AcquisitionTimestamp, HeaderField, HeaderValues, LabelSpec, PhysioFiles, Rule, RuleGroup,
    RuleSet, SemanticType, SeriesLocator, SeriesRecord, TagDictionary,
};
use proptest::prelude::*;

fn rule(include: &[&str], exclude: &[&str], modality: &str) -> Rule {
    Rule {
        header_field: HeaderField::SeriesDescription,
        include: include.iter().map(|term| (*term).to_string()).collect(),
        exclude: exclude.iter().map(|term| (*term).to_string()).collect(),
        modality: modality.to_string(),
        task: None,
        acq: None,
        rec: None,
    }
}

fn series(description: &str) -> SeriesRecord {
    let mut headers = HeaderValues::new();
    headers.insert(HeaderField::SeriesDescription, description);
    SeriesRecord {
        locator: SeriesLocator::new(format!("exam/{description}")),
        patient_id: "P1".to_string(),
        acquisition: AcquisitionTimestamp::parse("20200101_1200"),
        headers,
        physio: PhysioFiles::default(),
    }
}

fn sample_rules() -> RuleSet {
    let mut bold = rule(&["bold"], &["sbref"], "bold");
    bold.task = Some(LabelSpec::Pattern(r"task[-_]([a-z0-9]+)".to_string()));
    let mut sbref = rule(&["bold", "sbref"], &[], "sbref");
    sbref.task = Some(LabelSpec::Fixed("task-rest".to_string()));
    let mut mprage = rule(&["t1"], &[], "T1w");
    mprage.acq = Some(LabelSpec::Pattern("mprage|spgr".to_string()));
    mprage.rec = Some(LabelSpec::Fixed("norm".to_string()));
    RuleSet::new(
        vec![
            RuleGroup {
                semantic_type: SemanticType::Anat,
                rules: vec![mprage, rule(&["t2"], &[], "T2w")],
            },
            RuleGroup {
                semantic_type: SemanticType::Func,
                rules: vec![bold, sbref],
            },
        ],
        TagDictionary::new(),
    )
}

#[test]
fn matches_whole_words_only() {
    let matcher = Matcher::new(&sample_rules()).expect("matcher");
    let matched = matcher
        .classification_for(&series("task_bold_run1"))
        .expect("bold matches");
    assert_eq!(matched.semantic_type, SemanticType::Func);
    assert_eq!(matched.modality, "bold");
    assert!(matcher.classification_for(&series("boldly")).is_none());
}

#[test]
fn earlier_rule_wins() {
    let rules = RuleSet::new(
        vec![
            RuleGroup {
                semantic_type: SemanticType::Anat,
                rules: vec![rule(&["mprage"], &[], "T1w"), rule(&["mprage"], &[], "T1map")],
            },
            RuleGroup {
                semantic_type: SemanticType::Func,
                rules: vec![rule(&["mprage"], &[], "bold")],
            },
        ],
        TagDictionary::new(),
    );
    let matcher = Matcher::new(&rules).expect("matcher");
    let matched = matcher
        .classification_for(&series("sag_mprage"))
        .expect("match");
    assert_eq!(matched.modality, "T1w");
    assert_eq!(matched.rule.to_string(), "anat[0]");
}

#[test]
fn exclude_terms_disqualify() {
    let matcher = Matcher::new(&sample_rules()).expect("matcher");
    let matched = matcher
        .classification_for(&series("rest_bold_sbref"))
        .expect("sbref rule");
    assert_eq!(matched.modality, "sbref");
    assert_eq!(matched.task.as_deref(), Some("rest"));
}

#[test]
fn functional_task_extracted_or_defaulted() {
    let matcher = Matcher::new(&sample_rules()).expect("matcher");
    let named = matcher
        .classification_for(&series("bold_task-nback2_run1"))
        .expect("match");
    assert_eq!(named.task.as_deref(), Some("nback2"));

    let unnamed = matcher.classification_for(&series("bold")).expect("match");
    assert_eq!(unnamed.task.as_deref(), Some(UNSPECIFIED_TASK));
}

#[test]
fn non_functional_series_carry_no_task() {
    let matcher = Matcher::new(&sample_rules()).expect("matcher");
    let anat = matcher
        .classification_for(&series("t1_mprage_sag"))
        .expect("match");
    assert_eq!(anat.task, None);
    assert_eq!(anat.acq.as_deref(), Some("mprage"));
    assert_eq!(anat.rec.as_deref(), Some("norm"));

    let plain = matcher.classification_for(&series("t2_tse")).expect("match");
    assert_eq!(plain.acq, None);
    assert_eq!(plain.rec, None);
}

#[test]
fn localizer_is_unmatched() {
    let matcher = Matcher::new(&sample_rules()).expect("matcher");
    let unmatched = matcher
        .classify(series("localizer"))
        .expect_err("no rule applies");
    assert_eq!(unmatched.series.locator.as_str(), "exam/localizer");
}

#[test]
fn classify_keeps_identifiers_unassigned() {
    let matcher = Matcher::new(&sample_rules()).expect("matcher");
    let record = matcher.classify(series("t2_tse")).expect("match");
    assert_eq!(record.classification.modality, "T2w");
    assert!(record.subject_id.is_none());
    assert!(record.session_id.is_none());
    assert!(record.run_id.is_none());
}

proptest! {
    #[test]
    fn classification_is_repeatable(description in "[a-z0-9 _-]{0,24}") {
        let matcher = Matcher::new(&sample_rules()).expect("matcher");
        let record = series(&description);
        let first = matcher.classification_for(&record);
        let second = matcher.classification_for(&record);
        prop_assert_eq!(first, second);
    }
}
