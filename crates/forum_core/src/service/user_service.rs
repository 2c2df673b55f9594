//! User use-cases: registration, account codes, profile and social graph.
//!
//! # Responsibility
//! - Derive latest topics/replies and follow relations at read time.
//! - Register users with increasing ordinals taken from the status
//!   singleton. An insert that fails after allocation leaves a gap.
//!
//! # Invariants
//! - `follow`/`unfollow` write the follower first, then the followee; each
//!   write is idempotent so a retry after a partial failure converges.
//! - Usernames are unique; the store index is the final arbiter.

use crate::model::comment::Comment;
use crate::model::content::ContentKind;
use crate::model::id::{Collection, Document, Ref};
use crate::model::now_epoch_ms;
use crate::model::topic::Topic;
use crate::model::user::{Profile, User};
use crate::model::validation::ValidationError;
use crate::service::error::{ModelError, ModelResult};
use crate::service::status_service::StatusService;
use crate::service::{find_user, follow_up, resolve_user};
use crate::store::{DocumentStore, DocumentStoreExt, Filter, Query, StoreError, Update};
use log::{info, warn};
use uuid::Uuid;

/// Default size of the latest-topics and latest-replies views.
pub const LATEST_LIMIT: u32 = 10;

/// Registration request; `password_hash` is hashed by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterUser {
    pub username: String,
    pub password_hash: String,
    pub email: String,
}

pub struct UserService<S: DocumentStore> {
    store: S,
    latest_limit: u32,
}

impl<S: DocumentStore> UserService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            latest_limit: LATEST_LIMIT,
        }
    }

    /// Overrides the size of latest-N views.
    pub fn with_latest_limit(mut self, limit: u32) -> Self {
        self.latest_limit = limit;
        self
    }

    /// Creates an inactive account with the next registration ordinal.
    ///
    /// # Errors
    /// - `UsernameTaken` when the username already exists.
    /// - `Validation` for empty or malformed fields.
    /// - `NotFound` on `status` when `StatusService::ensure_initialized` has
    ///   never run.
    /// - `FollowUpFailed` when the user was stored but `user_count` was not
    ///   bumped.
    pub fn register(&self, request: RegisterUser) -> ModelResult<User> {
        if find_user(&self.store, &request.username)?.is_some() {
            return Err(ModelError::UsernameTaken(request.username));
        }

        let draft = User::new(
            &request.username,
            &request.password_hash,
            &request.email,
            0,
            now_epoch_ms(),
        );
        draft.validate()?;

        let status = StatusService::new(&self.store);
        let user = User {
            index: status.allocate_user_index()?,
            ..draft
        };

        match self.store.insert_doc(&user) {
            Ok(()) => {}
            Err(StoreError::Conflict { .. }) => {
                return Err(ModelError::UsernameTaken(request.username));
            }
            Err(err) => return Err(err.into()),
        }

        follow_up(Collection::Users, user.id, status.increment_users(1))?;
        info!(
            "event=user_register module=service status=ok user_id={} index={}",
            user.id, user.index
        );
        Ok(user)
    }

    /// Activates the account when `code` matches the pending validation code.
    pub fn activate(&self, username: &str, code: &str) -> ModelResult<User> {
        let user = self.require_user(username)?;
        if user.validate_code.as_deref() != Some(code) {
            warn!("event=user_activate module=service status=rejected user_id={}", user.id);
            return Err(ModelError::InvalidCode);
        }

        let update = Update::new()
            .set("is_active", true)
            .unset("validate_code");
        self.write_user(&user, &update)
    }

    /// Stores and returns a fresh password reset code.
    pub fn issue_reset_code(&self, username: &str) -> ModelResult<String> {
        let user = self.require_user(username)?;
        let code = Uuid::new_v4().simple().to_string();
        self.write_user(&user, &Update::new().set("reset_code", code.as_str()))?;
        Ok(code)
    }

    /// Replaces the password hash when `code` matches the reset code.
    pub fn reset_password(
        &self,
        username: &str,
        code: &str,
        password_hash: &str,
    ) -> ModelResult<User> {
        let user = self.require_user(username)?;
        if user.reset_code.as_deref() != Some(code) {
            return Err(ModelError::InvalidCode);
        }
        if password_hash.trim().is_empty() {
            return Err(ValidationError::EmptyField {
                entity: "user",
                field: "password",
            }
            .into());
        }

        let update = Update::new()
            .set("password", password_hash)
            .unset("reset_code");
        self.write_user(&user, &update)
    }

    /// Replaces every profile field; `None` clears the field.
    pub fn update_profile(&self, username: &str, profile: &Profile) -> ModelResult<User> {
        let user = self.require_user(username)?;
        let fields = [
            ("website", &profile.website),
            ("location", &profile.location),
            ("tagline", &profile.tagline),
            ("bio", &profile.bio),
            ("twitter", &profile.twitter),
            ("weibo", &profile.weibo),
        ];

        let update = fields
            .into_iter()
            .fold(Update::new(), |update, (path, value)| match value {
                Some(text) => update.set(path, text.as_str()),
                None => update.unset(path),
            });
        self.write_user(&user, &update)
    }

    /// Grants or revokes superuser rights.
    pub fn set_superuser(&self, username: &str, is_superuser: bool) -> ModelResult<User> {
        let user = self.require_user(username)?;
        let user = self.write_user(&user, &Update::new().set("is_superuser", is_superuser))?;
        info!(
            "event=user_superuser module=service status=ok user_id={} granted={is_superuser}",
            user.id
        );
        Ok(user)
    }

    pub fn get(&self, reference: Ref<User>) -> ModelResult<User> {
        resolve_user(&self.store, reference)
    }

    pub fn find_by_username(&self, username: &str) -> ModelResult<Option<User>> {
        find_user(&self.store, username)
    }

    /// Like `find_by_username`, with absence reported as `NotFound`.
    pub fn require_user(&self, username: &str) -> ModelResult<User> {
        find_user(&self.store, username)?
            .ok_or_else(|| ModelError::not_found(Collection::Users, username))
    }

    /// Newest topics created by `user`.
    pub fn latest_topics(&self, user: &User) -> ModelResult<Vec<Topic>> {
        let filter = Filter::new().eq_id("content.created_by", user.id);
        Ok(self.store.find_as::<Topic>(Query::latest(
            filter,
            "content.created_at",
            self.latest_limit,
        ))?)
    }

    /// Newest comments `user` left on topics.
    pub fn latest_replies(&self, user: &User) -> ModelResult<Vec<Comment>> {
        let filter = Filter::new()
            .eq_id("created_by", user.id)
            .eq("kind", ContentKind::Topic.as_str());
        Ok(self
            .store
            .find_as::<Comment>(Query::latest(filter, "created_at", self.latest_limit))?)
    }

    pub fn is_followed_by(&self, user: &User, who: &str) -> bool {
        user.is_followed_by(who)
    }

    pub fn is_fans(&self, user: &User, who: &str) -> bool {
        user.is_fans(who)
    }

    /// Records that `follower` follows `followee`.
    ///
    /// Returns the updated followee.
    pub fn follow(&self, follower: &str, followee: &str) -> ModelResult<User> {
        let (source, target) = self.relation_ends(follower, followee)?;
        self.write_user(&source, &Update::new().add_to_set("follow", followee))?;
        let target = follow_up(
            Collection::Users,
            source.id,
            self.store
                .update_doc::<User>(target.id, &Update::new().add_to_set("fans", follower)),
        )?;
        target.ok_or_else(|| ModelError::not_found(Collection::Users, followee))
    }

    /// Removes the follow relation; a no-op when it does not exist.
    pub fn unfollow(&self, follower: &str, followee: &str) -> ModelResult<User> {
        let (source, target) = self.relation_ends(follower, followee)?;
        self.write_user(&source, &Update::new().pull("follow", followee))?;
        let target = follow_up(
            Collection::Users,
            source.id,
            self.store
                .update_doc::<User>(target.id, &Update::new().pull("fans", follower)),
        )?;
        target.ok_or_else(|| ModelError::not_found(Collection::Users, followee))
    }

    fn relation_ends(&self, follower: &str, followee: &str) -> ModelResult<(User, User)> {
        if follower == followee {
            return Err(ValidationError::SelfFollow(follower.to_string()).into());
        }
        Ok((self.require_user(follower)?, self.require_user(followee)?))
    }

    fn write_user(&self, user: &User, update: &Update) -> ModelResult<User> {
        self.store
            .update_doc::<User>(user.id, update)?
            .ok_or_else(|| ModelError::not_found(Collection::Users, &user.username))
    }
}
