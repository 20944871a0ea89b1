pub mod error;
pub mod header;
pub mod labels;
pub mod record;
pub mod rule;

pub use error::{ModelError, Result};
pub use header::{DicomTag, FieldSpec, HeaderField, HeaderValues, TagDictionary};
pub use labels::{natural_cmp, sanitize_label};
pub use record::{
    AcquisitionTimestamp, Classification, ClassifiedRecord, MappingRow, MappingTable,
    PhysioFiles, SeriesLocator, SeriesRecord,
};
pub use rule::{LabelSpec, Rule, RuleGroup, RuleRef, RuleSet, SemanticType};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_fields_include_identity() {
        let rules = RuleSet::new(
            vec![RuleGroup {
                semantic_type: SemanticType::Anat,
                rules: vec![Rule {
                    header_field: HeaderField::SequenceName,
                    include: vec!["tfl3d".to_string()],
                    exclude: vec![],
                    modality: "T1w".to_string(),
                    task: None,
                    acq: None,
                    rec: None,
                }],
            }],
            TagDictionary::new(),
        );
        let fields = rules.required_fields();
        assert!(fields.contains(&HeaderField::SequenceName));
        for field in HeaderField::IDENTITY {
            assert!(fields.contains(&field));
        }
        assert_eq!(rules.rule_count(), 1);
        let reference = RuleRef {
            semantic_type: SemanticType::Anat,
            index: 0,
        };
        assert_eq!(reference.to_string(), "anat[0]");
        assert!(rules.rule(reference).is_some());
    }

    #[test]
    fn semantic_type_serializes_lowercase() {
        let json = serde_json::to_string(&SemanticType::Fmap).expect("serialize type");
        assert_eq!(json, "\"fmap\"");
        assert_eq!("FUNC".parse::<SemanticType>(), Ok(SemanticType::Func));
        assert!("pet".parse::<SemanticType>().is_err());
    }
}
