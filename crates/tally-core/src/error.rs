use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Could not parse date: {0}")]
    DateParse(String),

    #[error("Inconsistent data: {0}")]
    DataInconsistency(String),

    #[error("Calendar feed error: {0}")]
    Feed(String),
}

/// Severity of a [`Diagnostic`] surfaced next to pipeline output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// A recoverable problem encountered while building output. The pass that
/// produced it still returns a well-defined (possibly partial) result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }
}

impl From<&CoreError> for Diagnostic {
    fn from(err: &CoreError) -> Self {
        match err {
            CoreError::DateParse(_) => Diagnostic::info(err.to_string()),
            _ => Diagnostic::warning(err.to_string()),
        }
    }
}
