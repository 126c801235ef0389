use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimplecovError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Coverage path \"{path}\" does not contain {file}")]
    InvalidCoveragePath { path: PathBuf, file: &'static str },

    #[error(
        "Coverage directory not found. Searched upward from {searched_from} for {pattern}. \
         Set SIMPLECOV_COVERAGE_PATH to point at the directory explicitly."
    )]
    CoverageDirNotFound {
        searched_from: PathBuf,
        pattern: String,
    },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("{0}")]
    Other(String),
}

impl SimplecovError {
    /// Query-level failures are reported back to the caller instead of
    /// aborting the process.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, SimplecovError::FileNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, SimplecovError>;
