//! Error types for tree summary runs

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tree summary operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the tree summarizer
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory traversal error: {0}")]
    Traversal(#[from] walkdir::Error),

    #[error("State file error: {0}")]
    StateFile(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credentials: environment variable {var} is not set")]
    Credentials { var: String },

    #[error("Failed to read {path}: {message}")]
    FileRead { path: PathBuf, message: String },

    #[error("Summarization request failed: {0}")]
    Request(String),

    #[error("Unexpected response format: {0}")]
    MalformedResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// True for errors that should abort the whole run rather than a single file
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::Credentials { .. } | Error::Traversal(_) | Error::ThreadPool(_)
        )
    }
}
