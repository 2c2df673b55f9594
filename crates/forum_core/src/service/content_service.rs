//! Content use-cases shared by every kind, plus kind-specific accessors.
//!
//! # Responsibility
//! - Resolve creators, updaters, owners and comments of content items.
//! - Create, edit and count hits on content.
//! - Reconcile denormalized comment counts and latest-reply pointers.
//!
//! # Invariants
//! - Creation writes the item first; owner and status counters follow as
//!   separate writes.
//! - Deleting a topic never cascades implicitly; `delete_topic_cascade` is
//!   the explicit path.
//! - `can_edit` is evaluated against the current user document on every
//!   call.

use crate::model::article::{Article, Attribution};
use crate::model::comment::Comment;
use crate::model::content::{AnyContent, Content, ContentId, ContentItem, ContentKind, Edited};
use crate::model::id::{Collection, Document, Ref};
use crate::model::now_epoch_ms;
use crate::model::package::Package;
use crate::model::site::Site;
use crate::model::taxonomy::{ArticleCategory, Node, PackageCategory, SiteCategory, Taxonomy};
use crate::model::topic::{LatestReply, Topic};
use crate::model::user::User;
use crate::service::error::{ModelError, ModelResult};
use crate::service::status_service::StatusService;
use crate::service::{find_user, follow_up, permits_delete, permits_edit, resolve_user, signed};
use crate::store::{encode_field, DocumentStore, DocumentStoreExt, Filter, Query, Update};
use log::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTopic {
    pub node: Ref<Node>,
    pub title: String,
    pub markdown: String,
    pub author: Ref<User>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    pub category: Ref<ArticleCategory>,
    pub title: String,
    pub markdown: String,
    pub author: Ref<User>,
    /// Set for reprints.
    pub original: Option<Attribution>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSite {
    pub category: Ref<SiteCategory>,
    pub title: String,
    pub url: String,
    pub markdown: String,
    pub author: Ref<User>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPackage {
    pub category: Ref<PackageCategory>,
    pub name: String,
    pub url: String,
    pub markdown: String,
    pub author: Ref<User>,
}

pub struct ContentService<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> ContentService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads an item of kind `T`; an item of another kind is `NotFound`.
    pub fn get<T: ContentItem>(&self, id: ContentId) -> ModelResult<T> {
        self.store
            .load::<T>(id)?
            .ok_or_else(|| ModelError::not_found(Collection::Contents, id))
    }

    pub fn get_any(&self, id: ContentId) -> ModelResult<AnyContent> {
        self.store
            .load::<AnyContent>(id)?
            .ok_or_else(|| ModelError::not_found(Collection::Contents, id))
    }

    pub fn creator(&self, content: &Content) -> ModelResult<User> {
        resolve_user(&self.store, content.created_by)
    }

    /// Last editor, `None` when the content was never edited.
    pub fn updater(&self, content: &Content) -> ModelResult<Option<User>> {
        content
            .updated
            .map(|edited| resolve_user(&self.store, edited.by))
            .transpose()
    }

    /// Comments attached to `content_id`, in store order.
    pub fn comments(&self, content_id: ContentId) -> ModelResult<Vec<Comment>> {
        Ok(self
            .store
            .find_as::<Comment>(Query::new(Filter::new().eq_id("content_id", content_id)))?)
    }

    /// Comments attached to `content_id`, oldest first.
    pub fn comments_ascending(&self, content_id: ContentId) -> ModelResult<Vec<Comment>> {
        let mut comments = self.comments(content_id)?;
        comments.sort_by_key(|comment| comment.created_at);
        Ok(comments)
    }

    /// Whether `username` may edit `content`. Unknown users may not.
    pub fn can_edit(&self, content: &Content, username: &str) -> ModelResult<bool> {
        Ok(find_user(&self.store, username)?
            .is_some_and(|user| permits_edit(&user, content.created_by)))
    }

    pub fn node(&self, topic: &Topic) -> ModelResult<Node> {
        self.owner(topic)
    }

    /// Owning taxonomy entity of `item`, e.g. the category of a site.
    pub fn owner<T: ContentItem>(&self, item: &T) -> ModelResult<T::Owner> {
        let reference = item.owner();
        self.store.resolve(reference)?.ok_or_else(|| {
            ModelError::not_found(<T::Owner as Document>::COLLECTION, reference.id())
        })
    }

    /// Author of the newest attached reply.
    ///
    /// A reply whose author no longer exists degrades to `None`.
    pub fn latest_replier(&self, topic: &Topic) -> ModelResult<Option<User>> {
        let Some(reply) = topic.latest_reply else {
            return Ok(None);
        };
        let replier = self.store.resolve(reply.replier)?;
        if replier.is_none() {
            warn!(
                "event=dangling_reference module=service status=missing collection=users topic_id={}",
                topic.id
            );
        }
        Ok(replier)
    }

    pub fn create_topic(&self, request: NewTopic) -> ModelResult<Topic> {
        let topic = Topic::new(
            request.node,
            request.title,
            request.markdown,
            request.author,
            now_epoch_ms(),
        );
        self.create_item(topic)
    }

    pub fn create_article(&self, request: NewArticle) -> ModelResult<Article> {
        let article = Article {
            original: request.original,
            ..Article::new(
                request.category,
                request.title,
                request.markdown,
                request.author,
                now_epoch_ms(),
            )
        };
        self.create_item(article)
    }

    pub fn create_site(&self, request: NewSite) -> ModelResult<Site> {
        let site = Site::new(
            request.category,
            request.title,
            request.url,
            request.markdown,
            request.author,
            now_epoch_ms(),
        );
        self.create_item(site)
    }

    pub fn create_package(&self, request: NewPackage) -> ModelResult<Package> {
        let package = Package::new(
            request.category,
            request.name,
            request.url,
            request.markdown,
            request.author,
            now_epoch_ms(),
        );
        self.create_item(package)
    }

    /// Replaces title and source of an item `editor` is allowed to edit.
    ///
    /// # Errors
    /// - `Denied` when `editor` is unknown or lacks the edit permission.
    pub fn edit<T: ContentItem>(
        &self,
        id: ContentId,
        editor: &str,
        title: &str,
        markdown: &str,
    ) -> ModelResult<T> {
        let item = self.get::<T>(id)?;
        let user = find_user(&self.store, editor)?
            .filter(|user| permits_edit(user, item.envelope().created_by))
            .ok_or_else(|| ModelError::Denied {
                action: "edit content",
                username: editor.to_string(),
            })?;

        let mut revised = item.envelope().clone();
        revised.revise(title, markdown, Ref::of(&user), now_epoch_ms());
        revised.validate()?;

        let edited: Option<Edited> = revised.updated;
        let update = Update::new()
            .set("content.title", revised.title)
            .set("content.markdown", revised.markdown)
            .set("content.html", revised.html)
            .set("content.updated", encode_field(Collection::Contents, &edited)?);
        let item = self
            .store
            .update_doc::<T>(id, &update)?
            .ok_or_else(|| ModelError::not_found(Collection::Contents, id))?;

        info!(
            "event=content_edit module=service status=ok kind={} content_id={id}",
            T::KIND
        );
        Ok(item)
    }

    /// Counts one view; returns the new hit count.
    pub fn record_hit(&self, id: ContentId) -> ModelResult<u64> {
        let content = self
            .store
            .update_doc::<AnyContent>(id, &Update::new().inc("content.hits", 1))?
            .ok_or_else(|| ModelError::not_found(Collection::Contents, id))?;
        Ok(content.envelope().hits)
    }

    /// Rewrites `comment_count` from the attached comments and, for topics,
    /// `latest_reply` from the newest one.
    pub fn recount_content(&self, id: ContentId) -> ModelResult<AnyContent> {
        let content = self.get_any(id)?;
        let comments = self.comments(id)?;

        let mut update = Update::new().set("content.comment_count", comments.len());
        if content.kind() == ContentKind::Topic {
            // Later insertion wins among equal timestamps.
            let newest = comments.iter().max_by_key(|comment| comment.created_at);
            update = match newest {
                Some(comment) => update.set(
                    "latest_reply",
                    encode_field(
                        Collection::Contents,
                        &LatestReply {
                            replier: comment.created_by,
                            replied_at: comment.created_at,
                        },
                    )?,
                ),
                None => update.unset("latest_reply"),
            };
        }

        self.store
            .update_doc::<AnyContent>(id, &update)?
            .ok_or_else(|| ModelError::not_found(Collection::Contents, id))
    }

    /// Deletes a topic together with its comments, then adjusts counters.
    ///
    /// Returns the number of comments removed.
    ///
    /// # Errors
    /// - `Denied` unless `username` is a superuser.
    pub fn delete_topic_cascade(&self, id: ContentId, username: &str) -> ModelResult<u64> {
        let actor = find_user(&self.store, username)?;
        if !actor.as_ref().is_some_and(permits_delete) {
            return Err(ModelError::Denied {
                action: "delete topic",
                username: username.to_string(),
            });
        }

        let topic = self.get::<Topic>(id)?;
        let mut removed = 0_u64;
        for comment in self.comments(id)? {
            if self.store.delete_doc::<Comment>(comment.id)? {
                removed += 1;
            }
        }
        if !self.store.delete_doc::<Topic>(id)? {
            return Err(ModelError::not_found(Collection::Contents, id));
        }

        follow_up(
            Collection::Contents,
            id,
            self.store
                .update_doc::<Node>(topic.node.id(), &Update::new().inc("topic_count", -1)),
        )?;
        let status = StatusService::new(&self.store);
        follow_up(Collection::Contents, id, status.increment_topics(-1))?;
        follow_up(
            Collection::Contents,
            id,
            status.increment_replies(-signed(removed)),
        )?;

        info!(
            "event=topic_delete module=service status=ok content_id={id} comments={removed}"
        );
        Ok(removed)
    }

    /// Validates, checks author and owner, inserts, then bumps counters.
    fn create_item<T>(&self, item: T) -> ModelResult<T>
    where
        T: ContentItem,
        T::Owner: Taxonomy,
    {
        item.validate()?;
        resolve_user(&self.store, item.envelope().created_by)?;
        let owner = item.owner();
        if self.store.resolve(owner)?.is_none() {
            return Err(ModelError::not_found(<T::Owner as Document>::COLLECTION, owner.id()));
        }

        self.store.insert_doc(&item)?;

        if let Some(count_path) = <T::Owner as Taxonomy>::COUNT_PATH {
            follow_up(
                Collection::Contents,
                item.id(),
                self.store
                    .update_doc::<T::Owner>(owner.id(), &Update::new().inc(count_path, 1)),
            )?;
        }
        if T::KIND == ContentKind::Topic {
            follow_up(
                Collection::Contents,
                item.id(),
                StatusService::new(&self.store).increment_topics(1),
            )?;
        }

        info!(
            "event=content_create module=service status=ok kind={} content_id={}",
            T::KIND,
            item.id()
        );
        Ok(item)
    }
}
