//! Heuristic matcher.
//!
//! A [`Matcher`] is compiled once from a [`RuleSet`] and then shared
//! read-only across classification workers. Rules are evaluated as a single
//! ordered list: semantic types in configuration order, rules in list order
//! within each type. The first rule that accepts a series decides its
//! classification; later rules are never consulted, so more specific rules
//! must be declared earlier.

use regex::Regex;
use tracing::{debug, trace};

use bids_model::{
    Classification, ClassifiedRecord, HeaderField, LabelSpec, Rule, RuleRef, RuleSet,
    SeriesRecord, sanitize_label,
};

use crate::error::MatchError;
use crate::patterns::{UNSPECIFIED_TASK, extract_label, label_regex, term_regex};

/// Compiled form of a task/acq/rec label source.
#[derive(Debug, Clone)]
enum LabelSource {
    Fixed(String),
    Pattern(Regex),
}

impl LabelSource {
    fn compile(spec: &LabelSpec, rule: RuleRef) -> Result<Self, MatchError> {
        match spec {
            LabelSpec::Fixed(label) => Ok(Self::Fixed(label.clone())),
            LabelSpec::Pattern(pattern) => label_regex(pattern).map(Self::Pattern).map_err(|err| {
                MatchError::InvalidPattern {
                    rule,
                    pattern: pattern.clone(),
                    message: err.to_string(),
                }
            }),
        }
    }

    fn resolve(&self, entity: &str, value: &str) -> Option<String> {
        match self {
            Self::Fixed(label) => sanitize_label(entity, label),
            Self::Pattern(pattern) => {
                extract_label(pattern, value).and_then(|found| sanitize_label(entity, found))
            }
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    reference: RuleRef,
    field: HeaderField,
    include: Vec<Regex>,
    exclude: Vec<Regex>,
    modality: String,
    task: Option<LabelSource>,
    acq: Option<LabelSource>,
    rec: Option<LabelSource>,
}

impl CompiledRule {
    fn compile(rule: &Rule, reference: RuleRef) -> Result<Self, MatchError> {
        let modality = rule.modality.trim();
        if modality.is_empty() {
            return Err(MatchError::EmptyModality { rule: reference });
        }
        let compile_terms = |terms: &[String]| -> Result<Vec<Regex>, MatchError> {
            terms
                .iter()
                .map(|term| {
                    if term.trim().is_empty() {
                        return Err(MatchError::EmptyTerm { rule: reference });
                    }
                    term_regex(term).map_err(|err| MatchError::InvalidPattern {
                        rule: reference,
                        pattern: term.clone(),
                        message: err.to_string(),
                    })
                })
                .collect()
        };
        let compile_label = |spec: &Option<LabelSpec>| {
            spec.as_ref()
                .map(|spec| LabelSource::compile(spec, reference))
                .transpose()
        };
        Ok(Self {
            reference,
            field: rule.header_field.clone(),
            include: compile_terms(&rule.include)?,
            exclude: compile_terms(&rule.exclude)?,
            modality: modality.to_string(),
            task: compile_label(&rule.task)?,
            acq: compile_label(&rule.acq)?,
            rec: compile_label(&rule.rec)?,
        })
    }

    /// Returns the header value the rule accepted, if any.
    fn accepts<'a>(&self, series: &'a SeriesRecord) -> Option<&'a str> {
        let value = series.headers.get(&self.field)?;
        if !self.include.iter().all(|term| term.is_match(value)) {
            return None;
        }
        if self.exclude.iter().any(|term| term.is_match(value)) {
            return None;
        }
        Some(value)
    }

    fn classify(&self, value: &str) -> Classification {
        let semantic_type = self.reference.semantic_type;
        let task = semantic_type.has_task().then(|| {
            self.task
                .as_ref()
                .and_then(|source| source.resolve("task", value))
                .unwrap_or_else(|| UNSPECIFIED_TASK.to_string())
        });
        Classification {
            semantic_type,
            modality: self.modality.clone(),
            task,
            acq: self.acq.as_ref().and_then(|source| source.resolve("acq", value)),
            rec: self.rec.as_ref().and_then(|source| source.resolve("rec", value)),
            rule: self.reference,
        }
    }
}

/// A series no rule accepted. Carries the record back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unmatched {
    pub series: SeriesRecord,
}

/// Ordered, compiled rule list.
#[derive(Debug, Clone)]
pub struct Matcher {
    rules: Vec<CompiledRule>,
}

impl Matcher {
    /// Compiles every rule in `ruleset`, failing on the first invalid one.
    pub fn new(ruleset: &RuleSet) -> Result<Self, MatchError> {
        let mut rules = Vec::with_capacity(ruleset.rule_count());
        for group in ruleset.groups() {
            for (index, rule) in group.rules.iter().enumerate() {
                let reference = RuleRef {
                    semantic_type: group.semantic_type,
                    index,
                };
                rules.push(CompiledRule::compile(rule, reference)?);
            }
        }
        debug!(rules = rules.len(), "compiled heuristic rules");
        Ok(Self { rules })
    }

    /// Classification from the first rule that accepts `series`.
    pub fn classification_for(&self, series: &SeriesRecord) -> Option<Classification> {
        self.rules.iter().find_map(|rule| {
            let value = rule.accepts(series)?;
            trace!(
                locator = %series.locator,
                rule = %rule.reference,
                field = %rule.field,
                value,
                "rule accepted header value"
            );
            Some(rule.classify(value))
        })
    }

    /// Pairs `series` with its classification, or hands it back unmatched.
    pub fn classify(&self, series: SeriesRecord) -> Result<ClassifiedRecord, Unmatched> {
        match self.classification_for(&series) {
            Some(classification) => {
                debug!(
                    locator = %series.locator,
                    rule = %classification.rule,
                    modality = %classification.modality,
                    task = classification.task.as_deref().unwrap_or_default(),
                    "series classified"
                );
                Ok(ClassifiedRecord::new(series, classification))
            }
            None => Err(Unmatched { series }),
        }
    }
}
