//! Error types for selector operations.

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown time selection: {0}")]
    UnknownTimeSelection(String),

    #[error("Invalid time range: from {from} is after to {to}")]
    InvalidTimeRange { from: i64, to: i64 },

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Label values lookup failed: {0}")]
    LabelValues(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// A strict parse failure, located by byte offset into the expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for ParseError {}

pub type Result<T> = std::result::Result<T, Error>;
