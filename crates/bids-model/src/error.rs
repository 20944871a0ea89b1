use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("DICOM tag '{0}' must be two hexadecimal values separated by a comma")]
    TagShape(String),
    #[error("DICOM tag '{tag}': '{part}' is not a valid 16-bit hexadecimal number")]
    TagHex { tag: String, part: String },
    #[error("field spec for '{0}' lists no tags")]
    EmptyFieldSpec(String),
    #[error("unknown header field '{0}' (not built in and not declared under [tags])")]
    UnknownHeaderField(String),
    #[error("no tag specification for header field '{0}'")]
    MissingFieldSpec(String),
    #[error("unknown semantic type '{0}'")]
    UnknownSemanticType(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
