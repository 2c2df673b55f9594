//! Write-time validation errors shared by every entity.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failures detected before a document is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is empty after trimming.
    EmptyField {
        entity: &'static str,
        field: &'static str,
    },
    /// Username contains whitespace or control characters.
    InvalidUsername(String),
    /// Slug contains characters outside `[a-z0-9_-]`.
    InvalidSlug(String),
    /// A user tried to follow themselves.
    SelfFollow(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField { entity, field } => {
                write!(f, "{entity}.{field} must not be empty")
            }
            Self::InvalidUsername(value) => write!(f, "invalid username `{value}`"),
            Self::InvalidSlug(value) => {
                write!(f, "invalid slug `{value}`; expected [a-z0-9_-]")
            }
            Self::SelfFollow(value) => write!(f, "user `{value}` cannot follow themselves"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(
    entity: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { entity, field });
    }
    Ok(())
}

pub(crate) fn require_slug(value: &str) -> Result<(), ValidationError> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidSlug(value.to_string()))
    }
}
