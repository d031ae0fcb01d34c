//! Task model types and input validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum title length in bytes (1 KiB).
pub const TITLE_MAX_LENGTH: usize = 1024;

/// Maximum description length in bytes (16 KiB).
pub const DESCRIPTION_MAX_LENGTH: usize = 16 * 1024;

/// Task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Task is open and awaiting completion.
    #[default]
    Open,
    /// Task has been completed.
    Done,
}

impl Status {
    /// Parse a status from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid status.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, InvalidStatus> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "done" => Ok(Self::Done),
            _ => Err(InvalidStatus(s.to_string())),
        }
    }

    /// Get the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid status string is provided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidStatus(pub String);

impl std::fmt::Display for InvalidStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid status: '{}' (must be one of: open, done)", self.0)
    }
}

impl std::error::Error for InvalidStatus {}

/// A task record owned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier, strictly increasing, immutable.
    pub id: i64,
    /// Short title (non-empty, at most [`TITLE_MAX_LENGTH`] bytes).
    pub title: String,
    /// Longer description (may be empty, at most
    /// [`DESCRIPTION_MAX_LENGTH`] bytes).
    pub description: String,
    /// Current status.
    pub status: Status,
    /// Archived tasks are excluded from default listings but retained
    /// until explicitly deleted.
    pub archived: bool,
    /// When the task was created.
    pub created: DateTime<Utc>,
    /// Optional due date. `None` means no due date.
    pub due: Option<DateTime<Utc>>,
}

/// Filters for [`crate::store::TaskStore::search`].
#[derive(Debug, Default, Clone)]
pub struct SearchFilters {
    /// Whether to return archived tasks instead of active ones.
    pub archived: bool,
    /// Free-text query. Blank or whitespace-only means "list all",
    /// bypassing the text index entirely.
    pub text_match: String,
}

/// Per-field validation failure flags.
///
/// Returned instead of an opaque error so collaborators can render a message
/// next to the field that failed. [`ValidationError::is_err`] is true iff at
/// least one flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationError {
    /// The title is empty.
    pub title_empty: bool,
    /// The title exceeds [`TITLE_MAX_LENGTH`] bytes.
    pub title_too_long: bool,
    /// The description exceeds [`DESCRIPTION_MAX_LENGTH`] bytes.
    pub description_too_long: bool,
}

impl ValidationError {
    /// Check whether any validation failure flag is set.
    #[must_use]
    pub const fn is_err(&self) -> bool {
        self.title_empty || self.title_too_long || self.description_too_long
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut failures = Vec::new();
        if self.title_empty {
            failures.push("title empty");
        }
        if self.title_too_long {
            failures.push("title too long");
        }
        if self.description_too_long {
            failures.push("description too long");
        }
        write!(f, "invalid task: {}", failures.join(", "))
    }
}

impl std::error::Error for ValidationError {}

/// Validate task inputs, returning per-field failure flags.
///
/// Pure and deterministic; performs no mutation.
#[must_use]
pub fn validate(title: &str, description: &str) -> ValidationError {
    ValidationError {
        title_empty: title.is_empty(),
        title_too_long: title.len() > TITLE_MAX_LENGTH,
        description_too_long: description.len() > DESCRIPTION_MAX_LENGTH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_validate_ok() {
        let v = validate("Buy milk", "Two liters, whole");
        assert!(!v.is_err());
        assert_eq!(v, ValidationError::default());
    }

    #[test]
    fn test_validate_empty_title() {
        let v = validate("", "");
        assert!(v.is_err());
        assert!(v.title_empty);
        assert!(!v.title_too_long);
        assert!(!v.description_too_long);
    }

    #[test]
    fn test_validate_title_too_long() {
        let v = validate(&"x".repeat(TITLE_MAX_LENGTH + 1), "");
        assert!(v.is_err());
        assert!(v.title_too_long);
        assert!(!v.title_empty);
    }

    #[test]
    fn test_validate_title_at_limit_is_ok() {
        let v = validate(&"x".repeat(TITLE_MAX_LENGTH), "");
        assert!(!v.is_err());
    }

    #[test]
    fn test_validate_description_too_long() {
        let v = validate("t", &"x".repeat(DESCRIPTION_MAX_LENGTH + 1));
        assert!(v.is_err());
        assert!(v.description_too_long);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [Status::Open, Status::Done] {
            assert_eq!(Status::from_str(status.as_str()).unwrap(), status);
        }
        assert!(Status::from_str("closed").is_err());
    }

    proptest! {
        // validate() is pure: calling it twice yields identical flags, and
        // is_err() holds exactly when at least one flag is set.
        #[test]
        fn prop_validate_deterministic(title in ".{0,64}", description in ".{0,64}") {
            let a = validate(&title, &description);
            let b = validate(&title, &description);
            prop_assert_eq!(a, b);
            prop_assert_eq!(
                a.is_err(),
                a.title_empty || a.title_too_long || a.description_too_long
            );
        }
    }
}
