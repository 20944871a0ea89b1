#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod raw;

pub use crate::error::HeuristicsError;
pub use crate::loader::{
    DEFAULT_HEURISTICS, DocumentFormat, Heuristics, MergeMode, build_heuristics, default_document,
    load_heuristics, merge_documents, parse_document, read_document,
};
pub use crate::raw::{RawDocument, RawGroups, RawRule, RawTagSpec};
