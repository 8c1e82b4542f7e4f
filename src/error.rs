use thiserror::Error;

use crate::periodics::ClassificationError;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Job classification failed: {0}")]
    Classification(#[from] ClassificationError),

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Git command failed: {0}")]
    Git(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
