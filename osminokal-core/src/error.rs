//! Error types for the osminokal pipeline.

use thiserror::Error;

/// Errors that can occur while syncing sessions.
#[derive(Error, Debug)]
pub enum OsminokalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Couldn't get sessions from source '{provider}': {reason}")]
    SourceFetch { provider: String, reason: String },

    #[error("Operation canceled")]
    Canceled,

    #[error("Couldn't write to calendar '{calendar}': {reason}")]
    Materialize { calendar: String, reason: String },
}

impl OsminokalError {
    pub fn source_fetch(provider: &str, reason: impl ToString) -> Self {
        OsminokalError::SourceFetch {
            provider: provider.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn materialize(calendar: &str, reason: impl ToString) -> Self {
        OsminokalError::Materialize {
            calendar: calendar.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True when the error is a shutdown rather than a failure.
    pub fn is_canceled(&self) -> bool {
        matches!(self, OsminokalError::Canceled)
    }
}

/// Result type alias for osminokal operations.
pub type OsminokalResult<T> = Result<T, OsminokalError>;
