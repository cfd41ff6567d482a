//! Error types for the bundle-size CLI

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("No {file_name} found in {searched_from} or any parent directory")]
    ConfigurationNotFound {
        file_name: &'static str,
        searched_from: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid fixture pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Failed to prepare fixture '{fixture}': {source}")]
    Prepare {
        fixture: String,
        #[source]
        source: bundle_size_core::Error,
    },

    #[error("Failed to build fixture '{fixture}': {message}")]
    Build { fixture: String, message: String },

    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Failed to read file: {path}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
