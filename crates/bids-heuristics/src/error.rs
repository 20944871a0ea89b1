use std::path::PathBuf;

use bids_map::MatchError;
use bids_model::ModelError;

#[derive(Debug, thiserror::Error)]
pub enum HeuristicsError {
    #[error("failed to read heuristics file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML heuristics {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse JSON heuristics {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported heuristics file type {path} (expected .toml or .json)")]
    UnsupportedFormat { path: PathBuf },

    #[error("invalid tag for header field '{field}': {source}")]
    InvalidTag {
        field: String,
        #[source]
        source: ModelError,
    },

    #[error("header field '{field}' declares no tags")]
    EmptyTagSpec { field: String },

    #[error("unknown semantic type '{name}'")]
    UnknownSemanticType { name: String },

    #[error("semantic type '{name}' is declared more than once")]
    DuplicateSemanticType { name: String },

    #[error("rule {semantic_type}[{index}] names unknown header field '{field}'")]
    UnknownHeaderField {
        semantic_type: String,
        index: usize,
        field: String,
    },

    #[error("header field '{field}' has no tag specification")]
    MissingFieldSpec { field: String },

    #[error("heuristics define no rules")]
    EmptyRuleSet,

    #[error(transparent)]
    Rule(#[from] MatchError),
}

impl HeuristicsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
