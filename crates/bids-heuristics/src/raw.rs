//! Serde shapes of a heuristics document, before validation.
//!
//! Both the current key names and the legacy JSON ones (`BIDS_TAGS`,
//! `DICOM_TAGS`, `dicom_field`, `bids_modality`, `*_regexp`, `task_name`)
//! are accepted.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawDocument {
    #[serde(default, alias = "DICOM_TAGS")]
    pub tags: BTreeMap<String, RawTagSpec>,
    #[serde(default, alias = "BIDS_TAGS")]
    pub heuristics: RawGroups,
}

/// One tag or an ordered fallback list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawTagSpec {
    One(String),
    Many(Vec<String>),
}

impl RawTagSpec {
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::One(tag) => vec![tag.as_str()],
            Self::Many(tags) => tags.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawRule {
    #[serde(alias = "dicom_field")]
    pub header_field: String,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(alias = "bids_modality")]
    pub modality: String,
    #[serde(default, alias = "task_name")]
    pub task: Option<String>,
    #[serde(default, alias = "task_regexp")]
    pub task_pattern: Option<String>,
    #[serde(default)]
    pub acq: Option<String>,
    #[serde(default, alias = "acq_regexp")]
    pub acq_pattern: Option<String>,
    #[serde(default)]
    pub rec: Option<String>,
    #[serde(default, alias = "rec_regexp")]
    pub rec_pattern: Option<String>,
}

/// Rule lists keyed by semantic type, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawGroups(pub Vec<(String, Vec<RawRule>)>);

impl RawGroups {
    pub fn iter(&self) -> impl Iterator<Item = &(String, Vec<RawRule>)> {
        self.0.iter()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.0
            .iter()
            .position(|(existing, _)| existing.trim().eq_ignore_ascii_case(name.trim()))
    }

    /// Puts `rules` ahead of any existing rules for `name`, or appends a
    /// new group.
    pub fn prepend(&mut self, name: String, mut rules: Vec<RawRule>) {
        match self.position(&name) {
            Some(index) => {
                rules.append(&mut self.0[index].1);
                self.0[index].1 = rules;
            }
            None => self.0.push((name, rules)),
        }
    }
}

impl<'de> Deserialize<'de> for RawGroups {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = RawGroups;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table of rule lists keyed by semantic type")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut groups = Vec::new();
                while let Some((name, rules)) = map.next_entry::<String, Vec<RawRule>>()? {
                    groups.push((name, rules));
                }
                Ok(RawGroups(groups))
            }
        }

        deserializer.deserialize_map(GroupsVisitor)
    }
}
