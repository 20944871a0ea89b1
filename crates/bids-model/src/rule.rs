//! Heuristic rules, grouped by semantic type.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::header::{HeaderField, TagDictionary};

/// BIDS datatype directory a series is sorted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Anat,
    Func,
    Dwi,
    Fmap,
    Perf,
}

impl SemanticType {
    pub const ALL: [SemanticType; 5] = [
        SemanticType::Anat,
        SemanticType::Func,
        SemanticType::Dwi,
        SemanticType::Fmap,
        SemanticType::Perf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anat => "anat",
            Self::Func => "func",
            Self::Dwi => "dwi",
            Self::Fmap => "fmap",
            Self::Perf => "perf",
        }
    }

    /// Only functional series carry a task label.
    pub fn has_task(&self) -> bool {
        matches!(self, Self::Func)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SemanticType {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| ModelError::UnknownSemanticType(raw.to_string()))
    }
}

/// How a task/acq/rec label is derived once a rule matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelSpec {
    /// Use this label verbatim.
    Fixed(String),
    /// Search this (case-insensitive) regex in the matched header value;
    /// capture group 1 if present, else the whole match.
    Pattern(String),
}

impl fmt::Display for LabelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(label) => f.write_str(label),
            Self::Pattern(pattern) => write!(f, "/{pattern}/"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub header_field: HeaderField,
    /// Every term must appear as a bounded word.
    pub include: Vec<String>,
    /// Any term appearing as a bounded word disqualifies the rule.
    pub exclude: Vec<String>,
    pub modality: String,
    pub task: Option<LabelSpec>,
    pub acq: Option<LabelSpec>,
    pub rec: Option<LabelSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleGroup {
    pub semantic_type: SemanticType,
    pub rules: Vec<Rule>,
}

/// Identifies the rule that produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuleRef {
    pub semantic_type: SemanticType,
    /// Zero-based position within the semantic type's rule list.
    pub index: usize,
}

impl fmt::Display for RuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.semantic_type, self.index)
    }
}

/// A validated, immutable rule set. Group order is evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    groups: Vec<RuleGroup>,
    tags: TagDictionary,
}

impl RuleSet {
    pub fn new(groups: Vec<RuleGroup>, tags: TagDictionary) -> Self {
        Self { groups, tags }
    }

    pub fn groups(&self) -> &[RuleGroup] {
        &self.groups
    }

    pub fn tags(&self) -> &TagDictionary {
        &self.tags
    }

    pub fn rule_count(&self) -> usize {
        self.groups.iter().map(|group| group.rules.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0
    }

    /// Header fields the rules inspect, plus the identity fields.
    pub fn required_fields(&self) -> BTreeSet<HeaderField> {
        let mut fields: BTreeSet<HeaderField> = HeaderField::IDENTITY.into_iter().collect();
        for group in &self.groups {
            for rule in &group.rules {
                fields.insert(rule.header_field.clone());
            }
        }
        fields
    }

    pub fn rule(&self, reference: RuleRef) -> Option<&Rule> {
        self.groups
            .iter()
            .find(|group| group.semantic_type == reference.semantic_type)
            .and_then(|group| group.rules.get(reference.index))
    }
}
