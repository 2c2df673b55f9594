//! Comment use-cases.
//!
//! # Responsibility
//! - Attach comments to content and keep the owner's reply pointers.
//! - Resolve comment authors and owning topics.
//!
//! # Invariants
//! - `add_comment` inserts first and attaches second. Between the two
//!   writes the comment is visible through `comments` while the owner's
//!   `comment_count`/`latest_reply` still describe the previous state.
//! - Only superusers delete comments, authors included.

use crate::model::comment::Comment;
use crate::model::content::{AnyContent, ContentId, ContentKind};
use crate::model::id::{Collection, Document, EntityId, Ref};
use crate::model::now_epoch_ms;
use crate::model::topic::{LatestReply, Topic};
use crate::model::user::User;
use crate::service::content_service::ContentService;
use crate::service::error::{ModelError, ModelResult};
use crate::service::status_service::StatusService;
use crate::service::{find_user, follow_up, permits_delete, permits_edit, resolve_user};
use crate::store::{encode_field, DocumentStore, DocumentStoreExt, Update};
use log::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub content_id: ContentId,
    pub markdown: String,
    pub author: Ref<User>,
}

pub struct CommentService<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> CommentService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Stores a comment, then attaches it to its content.
    ///
    /// # Errors
    /// - `NotFound` when the content or the author is missing.
    /// - `FollowUpFailed` when the comment was stored but attaching it to
    ///   the content or bumping `reply_count` failed.
    pub fn add_comment(&self, request: NewComment) -> ModelResult<Comment> {
        let content = self
            .store
            .load::<AnyContent>(request.content_id)?
            .ok_or_else(|| ModelError::not_found(Collection::Contents, request.content_id))?;
        resolve_user(&self.store, request.author)?;

        let comment = Comment::new(
            content.kind(),
            request.content_id,
            request.markdown,
            request.author,
            now_epoch_ms(),
        );
        comment.validate()?;
        self.store.insert_doc(&comment)?;

        follow_up(Collection::Comments, comment.id, self.attach(&comment))?;
        info!(
            "event=comment_add module=service status=ok kind={} content_id={} comment_id={}",
            comment.kind, comment.content_id, comment.id
        );
        Ok(comment)
    }

    pub fn get(&self, id: EntityId) -> ModelResult<Comment> {
        self.store
            .load::<Comment>(id)?
            .ok_or_else(|| ModelError::not_found(Collection::Comments, id))
    }

    pub fn creator(&self, comment: &Comment) -> ModelResult<User> {
        resolve_user(&self.store, comment.created_by)
    }

    /// Whether `username` may delete `comment`. Unknown users may not.
    pub fn can_delete(&self, _comment: &Comment, username: &str) -> ModelResult<bool> {
        Ok(find_user(&self.store, username)?.is_some_and(|user| permits_delete(&user)))
    }

    /// Topic the comment belongs to.
    ///
    /// A comment attached to any other kind yields `NotFound`, even when
    /// that content exists.
    pub fn topic(&self, comment: &Comment) -> ModelResult<Topic> {
        self.store
            .load::<Topic>(comment.content_id)?
            .ok_or_else(|| ModelError::not_found(Collection::Contents, comment.content_id))
    }

    /// Content of any kind the comment belongs to.
    pub fn content(&self, comment: &Comment) -> ModelResult<AnyContent> {
        ContentService::new(&self.store).get_any(comment.content_id)
    }

    /// Replaces the source of a comment `editor` is allowed to edit.
    pub fn edit_comment(
        &self,
        id: EntityId,
        editor: &str,
        markdown: &str,
    ) -> ModelResult<Comment> {
        let comment = self.get(id)?;
        let user = find_user(&self.store, editor)?
            .filter(|user| permits_edit(user, comment.created_by))
            .ok_or_else(|| ModelError::Denied {
                action: "edit comment",
                username: editor.to_string(),
            })?;

        let mut revised = comment;
        revised.revise(markdown, Ref::of(&user), now_epoch_ms());
        revised.validate()?;

        let update = Update::new()
            .set("markdown", revised.markdown)
            .set("html", revised.html)
            .set("updated", encode_field(Collection::Comments, &revised.updated)?);
        self.store
            .update_doc::<Comment>(id, &update)?
            .ok_or_else(|| ModelError::not_found(Collection::Comments, id))
    }

    /// Removes a comment, then reconciles its content and the reply total.
    ///
    /// # Errors
    /// - `Denied` unless `username` is a superuser.
    pub fn delete_comment(&self, id: EntityId, username: &str) -> ModelResult<()> {
        let comment = self.get(id)?;
        if !self.can_delete(&comment, username)? {
            return Err(ModelError::Denied {
                action: "delete comment",
                username: username.to_string(),
            });
        }
        if !self.store.delete_doc::<Comment>(id)? {
            return Err(ModelError::not_found(Collection::Comments, id));
        }

        match ContentService::new(&self.store).recount_content(comment.content_id) {
            Ok(_) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return follow_up(Collection::Comments, id, Err(err)),
        }
        if comment.kind == ContentKind::Topic {
            follow_up(
                Collection::Comments,
                id,
                StatusService::new(&self.store).increment_replies(-1),
            )?;
        }

        info!("event=comment_delete module=service status=ok comment_id={id}");
        Ok(())
    }

    fn attach(&self, comment: &Comment) -> ModelResult<()> {
        let mut update = Update::new().inc("content.comment_count", 1);
        if comment.kind == ContentKind::Topic {
            let reply = LatestReply {
                replier: comment.created_by,
                replied_at: comment.created_at,
            };
            update = update.set("latest_reply", encode_field(Collection::Contents, &reply)?);
        }
        self.store
            .update_doc::<AnyContent>(comment.content_id, &update)?
            .ok_or_else(|| ModelError::not_found(Collection::Contents, comment.content_id))?;

        if comment.kind == ContentKind::Topic {
            StatusService::new(&self.store).increment_replies(1)?;
        }
        Ok(())
    }
}
