//! Deployment-wide aggregate counters.
//!
//! # Invariants
//! - Exactly one status document exists per deployment, at `STATUS_ID`.
//! - `user_index` is the last ordinal handed out; it only grows.
//! - Totals are best-effort hints; `recount` recomputes them from the
//!   collections when they must be exact.

use crate::model::id::{Collection, Document, EntityId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed identifier of the status singleton.
pub const STATUS_ID: EntityId = Uuid::nil();

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    #[serde(rename = "_id")]
    pub id: EntityId,
    #[serde(default)]
    pub user_count: u64,
    #[serde(default)]
    pub topic_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub user_index: u64,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            id: STATUS_ID,
            user_count: 0,
            topic_count: 0,
            reply_count: 0,
            user_index: 0,
        }
    }
}

impl Document for Status {
    const COLLECTION: Collection = Collection::Status;

    fn id(&self) -> EntityId {
        self.id
    }
}
