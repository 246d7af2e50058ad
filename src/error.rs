//! Error types for patchguard.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("malformed diff at line {line}: {message}")]
    DiffParse { line: usize, message: String },

    #[error("empty diff input")]
    EmptyDiff,

    #[error("resolver error: {0}")]
    Resolver(String),

    #[error("git error: {0}")]
    Git(String),
}

impl Error {
    /// Shorthand for a parse failure at a given 1-based input line.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::DiffParse {
            line,
            message: message.into(),
        }
    }
}
