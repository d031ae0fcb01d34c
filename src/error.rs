//! Error types for `tasklight`.

use crate::store::models::ValidationError;

/// Errors that can occur in the task store and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Task input failed validation. Carries per-field failure flags so
    /// collaborators can render field-specific messages.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// No task exists with the given id.
    #[error("task not found: {0}")]
    NotFound(i64),

    /// The text index failed to index or delete a document.
    #[error("text index error: {0}")]
    Index(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON serialization error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A template rendering error occurred.
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

impl Error {
    /// Return the validation failure flags if this is a validation error.
    #[must_use]
    pub const fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(v) => Some(v),
            _ => None,
        }
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
