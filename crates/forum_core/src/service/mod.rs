//! Forum use-case services.
//!
//! # Responsibility
//! - Expose resolution, derived views, authorization predicates and writes
//!   over the document store.
//! - Own the denormalized follow-up writes that keep counters and
//!   latest-reply pointers eventually consistent.
//!
//! # Invariants
//! - Every service receives its store handle explicitly; none reaches for a
//!   process-wide connection.
//! - Follow-up writes run after the primary write and are never wrapped in
//!   a cross-document transaction. A failed follow-up is reported as
//!   `ModelError::FollowUpFailed`; drift is repaired by recount.
//! - Store failures propagate unchanged; nothing is retried here.

use crate::model::id::{Collection, EntityId, Ref};
use crate::model::user::User;
use crate::store::{DocumentStore, DocumentStoreExt, Filter, Query};

pub mod comment_service;
pub mod content_service;
pub mod error;
pub mod status_service;
pub mod taxonomy_service;
pub mod user_service;

use error::{ModelError, ModelResult};

/// Edit policy: superusers, or the creator of the document.
pub(crate) fn permits_edit(user: &User, created_by: Ref<User>) -> bool {
    user.is_superuser || user.id == created_by.id()
}

/// Delete policy: superusers only, authors included.
pub(crate) fn permits_delete(user: &User) -> bool {
    user.is_superuser
}

/// Maps a follow-up write failure onto the primary document it belongs to.
pub(crate) fn follow_up<T, E: Into<ModelError>>(
    collection: Collection,
    id: EntityId,
    result: Result<T, E>,
) -> ModelResult<T> {
    result.map_err(|source| {
        let source = source.into();
        log::warn!(
            "event=counter_follow_up module=service status=error collection={collection} id={id}"
        );
        ModelError::FollowUpFailed {
            collection,
            id,
            source: Box::new(source),
        }
    })
}

pub(crate) fn resolve_user<S: DocumentStore>(
    store: &S,
    reference: Ref<User>,
) -> ModelResult<User> {
    store
        .resolve(reference)?
        .ok_or_else(|| ModelError::not_found(Collection::Users, reference.id()))
}

/// Looks a user up by username; absence is `None`.
pub(crate) fn find_user<S: DocumentStore>(
    store: &S,
    username: &str,
) -> ModelResult<Option<User>> {
    let query = Query {
        limit: Some(1),
        ..Query::new(Filter::new().eq("username", username))
    };
    Ok(store.find_as::<User>(query)?.into_iter().next())
}

/// Converts a count into a counter delta.
pub(crate) fn signed(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}
