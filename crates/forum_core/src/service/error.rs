//! Service-level error taxonomy.

use crate::model::id::{Collection, EntityId};
use crate::model::validation::ValidationError;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ModelResult<T> = Result<T, ModelError>;

/// Errors surfaced by use-case services.
///
/// Authorization predicates (`can_edit`, `can_delete`) return `bool`;
/// `Denied` is only produced by mutations that require a permission.
#[derive(Debug)]
pub enum ModelError {
    /// A referenced document is absent.
    NotFound {
        collection: Collection,
        /// Identifier or natural key (username, slug) that failed to resolve.
        key: String,
    },
    Validation(ValidationError),
    /// The acting user lacks the permission the operation requires.
    Denied {
        action: &'static str,
        username: String,
    },
    UsernameTaken(String),
    /// Another node or package category already uses this slug.
    SlugTaken(String),
    /// Validation or reset code did not match.
    InvalidCode,
    /// The primary write committed but a denormalized follow-up did not.
    ///
    /// The document identified here exists; counters drift until the next
    /// recount.
    FollowUpFailed {
        collection: Collection,
        id: EntityId,
        source: Box<ModelError>,
    },
    Store(StoreError),
}

impl ModelError {
    pub fn not_found(collection: Collection, key: impl ToString) -> Self {
        Self::NotFound {
            collection,
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { collection, key } => write!(f, "{collection} not found: {key}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Denied { action, username } => {
                write!(f, "user `{username}` is not allowed to {action}")
            }
            Self::UsernameTaken(username) => write!(f, "username already taken: {username}"),
            Self::SlugTaken(slug) => write!(f, "slug already taken: {slug}"),
            Self::InvalidCode => write!(f, "validation code does not match"),
            Self::FollowUpFailed {
                collection,
                id,
                source,
            } => write!(
                f,
                "{collection} document {id} was written but counter follow-up failed: {source}"
            ),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::FollowUpFailed { source, .. } => Some(source.as_ref()),
            Self::Store(err) => Some(err),
            Self::NotFound { .. } | Self::Denied { .. } | Self::UsernameTaken(_) => None,
            Self::SlugTaken(_) | Self::InvalidCode => None,
        }
    }
}

impl From<StoreError> for ModelError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<ValidationError> for ModelError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}
