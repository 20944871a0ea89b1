//! Regex construction for match terms and label patterns.

use regex::{Regex, RegexBuilder};

/// Label assigned to functional series whose task cannot be derived.
pub const UNSPECIFIED_TASK: &str = "unspecified";

/// Compiles a literal term that must appear as a whole word, bounded by
/// the start or end of the value or by a space, underscore or hyphen.
pub fn term_regex(term: &str) -> Result<Regex, regex::Error> {
    let escaped = regex::escape(term.trim());
    RegexBuilder::new(&format!(r"(?:^|[ _-]){escaped}(?:[ _-]|$)"))
        .case_insensitive(true)
        .build()
}

pub fn label_regex(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// First capture group if it participated in the match, else the whole match.
pub fn extract_label<'a>(pattern: &Regex, value: &'a str) -> Option<&'a str> {
    let captures = pattern.captures(value)?;
    captures
        .get(1)
        .or_else(|| captures.get(0))
        .map(|found| found.as_str())
}
