//! Forum domain model.
//!
//! # Responsibility
//! - Define the persisted shape of users, content kinds, taxonomies,
//!   comments and the status singleton.
//! - Keep cross-entity links as typed references resolved on demand.
//!
//! # Invariants
//! - Every document is identified by a stable `EntityId` stored as `_id`.
//! - Content kinds embed one shared `Content` envelope; the envelope's
//!   `kind` tag is the discriminant for kind-agnostic loads.
//! - Denormalized counters are hints kept eventually consistent, never
//!   authoritative.

use std::time::{SystemTime, UNIX_EPOCH};

pub mod article;
pub mod comment;
pub mod content;
pub mod id;
pub mod package;
pub mod site;
pub mod status;
pub mod taxonomy;
pub mod topic;
pub mod user;
pub mod validation;

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}
