//! Status singleton service.
//!
//! # Responsibility
//! - Create the singleton once and serve its counters.
//! - Apply best-effort counter increments and full recounts.
//!
//! # Invariants
//! - Increments are single-document updates; they are not idempotent when
//!   retried, so exact totals come from `recount`, which is.
//! - `user_index` never moves backwards, including during recount.

use crate::model::comment::Comment;
use crate::model::content::ContentKind;
use crate::model::id::Collection;
use crate::model::status::{Status, STATUS_ID};
use crate::model::topic::Topic;
use crate::model::user::User;
use crate::service::error::{ModelError, ModelResult};
use crate::store::{
    DocumentStore, DocumentStoreExt, Filter, Query, StoreError, StoreResult, Update,
};
use log::info;

const USER_COUNT: &str = "user_count";
const TOPIC_COUNT: &str = "topic_count";
const REPLY_COUNT: &str = "reply_count";
const USER_INDEX: &str = "user_index";

/// Service over the deployment-wide status document.
pub struct StatusService<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> StatusService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates the singleton when missing and returns its current state.
    ///
    /// Safe to call on every startup.
    pub fn ensure_initialized(&self) -> StoreResult<Status> {
        if let Some(status) = self.store.load::<Status>(STATUS_ID)? {
            return Ok(status);
        }

        let status = Status::default();
        match self.store.insert_doc(&status) {
            Ok(()) => {
                info!("event=status_init module=service status=ok");
                Ok(status)
            }
            Err(StoreError::Conflict { .. }) => self
                .store
                .load::<Status>(STATUS_ID)
                .map(|loaded| loaded.unwrap_or(status)),
            Err(err) => Err(err),
        }
    }

    pub fn load(&self) -> ModelResult<Status> {
        self.store
            .load::<Status>(STATUS_ID)?
            .ok_or_else(|| ModelError::not_found(Collection::Status, STATUS_ID))
    }

    pub fn increment_users(&self, delta: i64) -> ModelResult<Status> {
        self.bump(USER_COUNT, delta)
    }

    pub fn increment_topics(&self, delta: i64) -> ModelResult<Status> {
        self.bump(TOPIC_COUNT, delta)
    }

    pub fn increment_replies(&self, delta: i64) -> ModelResult<Status> {
        self.bump(REPLY_COUNT, delta)
    }

    /// Hands out the next user ordinal.
    pub fn allocate_user_index(&self) -> ModelResult<u64> {
        self.bump(USER_INDEX, 1).map(|status| status.user_index)
    }

    /// Recomputes totals by enumerating users, topics and topic replies.
    pub fn recount(&self) -> ModelResult<Status> {
        let current = self.load()?;
        let users = self.store.count_as::<User>(Filter::new())?;
        let topics = self.store.count_as::<Topic>(Filter::new())?;
        let replies = self
            .store
            .count_as::<Comment>(Filter::new().eq("kind", ContentKind::Topic.as_str()))?;
        let highest_index = self
            .store
            .find_as::<User>(Query::latest(Filter::new(), "index", 1))?
            .first()
            .map_or(0, |user| user.index);

        let update = Update::new()
            .set(USER_COUNT, users)
            .set(TOPIC_COUNT, topics)
            .set(REPLY_COUNT, replies)
            .set(USER_INDEX, current.user_index.max(highest_index));
        let status = self
            .store
            .update_doc::<Status>(STATUS_ID, &update)?
            .ok_or_else(|| ModelError::not_found(Collection::Status, STATUS_ID))?;

        info!(
            "event=status_recount module=service status=ok users={} topics={} replies={}",
            status.user_count, status.topic_count, status.reply_count
        );
        Ok(status)
    }

    fn bump(&self, path: &str, delta: i64) -> ModelResult<Status> {
        self.store
            .update_doc::<Status>(STATUS_ID, &Update::new().inc(path, delta))?
            .ok_or_else(|| ModelError::not_found(Collection::Status, STATUS_ID))
    }
}
