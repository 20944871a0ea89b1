//! Loading, merging and validating heuristics.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info, warn};

use bids_map::Matcher;
use bids_model::{
    DicomTag, FieldSpec, HeaderField, LabelSpec, Rule, RuleGroup, RuleSet, SemanticType,
    TagDictionary,
};

use crate::error::HeuristicsError;
use crate::raw::{RawDocument, RawRule, RawTagSpec};

/// The built-in heuristics document.
pub const DEFAULT_HEURISTICS: &str = include_str!("../data/default_heuristics.toml");

const DEFAULTS_ORIGIN: &str = "<built-in heuristics>";

/// How a user document combines with the built-in one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeMode {
    /// User rules go ahead of the built-in rules of the same semantic type;
    /// new semantic types are appended.
    #[default]
    Extend,
    /// Only the user's rules are used.
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Toml,
    Json,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        if extension.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if extension.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }
}

/// A validated rule set together with its compiled matcher.
#[derive(Debug, Clone)]
pub struct Heuristics {
    ruleset: RuleSet,
    matcher: Matcher,
}

impl Heuristics {
    pub fn ruleset(&self) -> &RuleSet {
        &self.ruleset
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }
}

pub fn parse_document(
    text: &str,
    format: DocumentFormat,
    origin: &Path,
) -> Result<RawDocument, HeuristicsError> {
    match format {
        DocumentFormat::Toml => toml::from_str(text).map_err(|source| HeuristicsError::Toml {
            path: origin.to_path_buf(),
            source,
        }),
        DocumentFormat::Json => {
            serde_json::from_str(text).map_err(|source| HeuristicsError::Json {
                path: origin.to_path_buf(),
                source,
            })
        }
    }
}

pub fn read_document(path: &Path) -> Result<RawDocument, HeuristicsError> {
    let format = DocumentFormat::from_path(path).ok_or_else(|| {
        HeuristicsError::UnsupportedFormat {
            path: path.to_path_buf(),
        }
    })?;
    let text = std::fs::read_to_string(path).map_err(|e| HeuristicsError::io(path, e))?;
    parse_document(&text, format, path)
}

pub fn default_document() -> Result<RawDocument, HeuristicsError> {
    parse_document(
        DEFAULT_HEURISTICS,
        DocumentFormat::Toml,
        &PathBuf::from(DEFAULTS_ORIGIN),
    )
}

/// Combines the built-in document with a user document.
///
/// Tags merge per field in both modes, user entries overriding built-in
/// ones, so built-in fields stay resolvable after a replace.
pub fn merge_documents(base: RawDocument, user: RawDocument, mode: MergeMode) -> RawDocument {
    let mut tags: BTreeMap<String, RawTagSpec> = BTreeMap::new();
    for (field, spec) in base.tags.into_iter().chain(user.tags) {
        tags.insert(field.trim().to_ascii_lowercase(), spec);
    }
    let heuristics = match mode {
        MergeMode::Replace => user.heuristics,
        MergeMode::Extend => {
            let mut groups = base.heuristics;
            for (name, rules) in user.heuristics.0 {
                groups.prepend(name, rules);
            }
            groups
        }
    };
    RawDocument { tags, heuristics }
}

/// Validates a document into a rule set and compiles its matcher.
pub fn build_heuristics(document: RawDocument) -> Result<Heuristics, HeuristicsError> {
    let tags = build_tags(&document)?;
    for field in HeaderField::IDENTITY {
        if tags.spec(&field).is_err() {
            return Err(HeuristicsError::MissingFieldSpec {
                field: field.to_string(),
            });
        }
    }

    let mut groups: Vec<RuleGroup> = Vec::new();
    for (name, raw_rules) in document.heuristics.iter() {
        let semantic_type = SemanticType::from_str(name)
            .map_err(|_| HeuristicsError::UnknownSemanticType { name: name.clone() })?;
        if groups
            .iter()
            .any(|group| group.semantic_type == semantic_type)
        {
            return Err(HeuristicsError::DuplicateSemanticType { name: name.clone() });
        }
        let rules = raw_rules
            .iter()
            .enumerate()
            .map(|(index, raw)| build_rule(raw, semantic_type, index, &tags))
            .collect::<Result<Vec<_>, _>>()?;
        groups.push(RuleGroup {
            semantic_type,
            rules,
        });
    }

    let ruleset = RuleSet::new(groups, tags);
    if ruleset.is_empty() {
        return Err(HeuristicsError::EmptyRuleSet);
    }
    let matcher = Matcher::new(&ruleset)?;
    Ok(Heuristics { ruleset, matcher })
}

fn build_tags(document: &RawDocument) -> Result<TagDictionary, HeuristicsError> {
    let mut tags = TagDictionary::new();
    for (field, raw) in &document.tags {
        let parsed = raw
            .values()
            .into_iter()
            .map(DicomTag::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| HeuristicsError::InvalidTag {
                field: field.clone(),
                source,
            })?;
        let spec = FieldSpec::new(parsed).ok_or_else(|| HeuristicsError::EmptyTagSpec {
            field: field.clone(),
        })?;
        tags.insert(field, spec);
    }
    Ok(tags)
}

fn build_rule(
    raw: &RawRule,
    semantic_type: SemanticType,
    index: usize,
    tags: &TagDictionary,
) -> Result<Rule, HeuristicsError> {
    let header_field = tags
        .field(&raw.header_field)
        .map_err(|_| HeuristicsError::UnknownHeaderField {
            semantic_type: semantic_type.to_string(),
            index,
            field: raw.header_field.clone(),
        })?;
    if tags.spec(&header_field).is_err() {
        return Err(HeuristicsError::MissingFieldSpec {
            field: header_field.to_string(),
        });
    }
    let label = |entity: &str, fixed: &Option<String>, pattern: &Option<String>| {
        label_spec(semantic_type, index, entity, fixed, pattern)
    };
    Ok(Rule {
        header_field,
        include: raw.include.clone(),
        exclude: raw.exclude.clone(),
        modality: raw.modality.clone(),
        task: label("task", &raw.task, &raw.task_pattern),
        acq: label("acq", &raw.acq, &raw.acq_pattern),
        rec: label("rec", &raw.rec, &raw.rec_pattern),
    })
}

/// A pattern takes precedence over a fixed label when both are given.
fn label_spec(
    semantic_type: SemanticType,
    index: usize,
    entity: &str,
    fixed: &Option<String>,
    pattern: &Option<String>,
) -> Option<LabelSpec> {
    let fixed = fixed.as_deref().map(str::trim).filter(|value| !value.is_empty());
    let pattern = pattern.as_deref().map(str::trim).filter(|value| !value.is_empty());
    match (fixed, pattern) {
        (Some(label), Some(pattern)) => {
            warn!(
                rule = %format!("{semantic_type}[{index}]"),
                entity,
                label,
                pattern,
                "rule sets both a fixed label and a pattern; using the pattern"
            );
            Some(LabelSpec::Pattern(pattern.to_string()))
        }
        (None, Some(pattern)) => Some(LabelSpec::Pattern(pattern.to_string())),
        (Some(label), None) => Some(LabelSpec::Fixed(label.to_string())),
        (None, None) => None,
    }
}

/// Loads the built-in heuristics, merged with an optional user file.
pub fn load_heuristics(
    user_file: Option<&Path>,
    mode: MergeMode,
) -> Result<Heuristics, HeuristicsError> {
    let defaults = default_document()?;
    let document = match user_file {
        Some(path) => {
            let user = read_document(path)?;
            debug!(path = %path.display(), ?mode, "merging user heuristics");
            merge_documents(defaults, user, mode)
        }
        None => defaults,
    };
    let heuristics = build_heuristics(document)?;
    info!(
        rules = heuristics.ruleset().rule_count(),
        semantic_types = heuristics.ruleset().groups().len(),
        user_file = user_file.is_some(),
        "heuristics loaded"
    );
    Ok(heuristics)
}
