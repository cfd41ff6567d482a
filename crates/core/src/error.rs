//! Error types for bundle-size-core

use thiserror::Error;

/// Result type alias for bundle-size-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why metadata could not be taken out of a fixture
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionFailure {
    #[error(
        "A fixture file should contain a default export with metadata.\n\
         For example: export default {{ name: 'Test fixture' }}"
    )]
    MissingDefaultExport,

    #[error("default export is not statically evaluable: {0}")]
    NotStaticallyEvaluable(String),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("validation failed for fixture metadata: {0}")]
    SchemaViolation(String),
}

/// Error types for the core crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to extract fixture metadata: {0}")]
    MetadataExtraction(#[from] ExtractionFailure),

    #[error("Duplicate fixture path in report: {0}")]
    DuplicatePath(String),

    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
