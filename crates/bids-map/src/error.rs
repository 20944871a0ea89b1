//! Error types for rule compilation.

use std::fmt;

use bids_model::RuleRef;

/// Errors raised while compiling a rule set into a [`crate::Matcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// An include or exclude term is blank.
    EmptyTerm { rule: RuleRef },
    /// A rule has no modality label.
    EmptyModality { rule: RuleRef },
    /// A task/acq/rec pattern is not a valid regular expression.
    InvalidPattern {
        rule: RuleRef,
        pattern: String,
        message: String,
    },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTerm { rule } => write!(f, "Rule {rule} has a blank match term"),
            Self::EmptyModality { rule } => write!(f, "Rule {rule} has no modality label"),
            Self::InvalidPattern {
                rule,
                pattern,
                message,
            } => write!(f, "Rule {rule} has invalid pattern '{pattern}': {message}"),
        }
    }
}

impl std::error::Error for MatchError {}
