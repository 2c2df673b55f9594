//! Discussion topic.
//!
//! # Invariants
//! - `latest_reply` is either absent (no replies attached yet) or carries
//!   both the replier and the reply time of the newest attached comment.
//! - Attaching a comment updates `latest_reply` and `comment_count` in a
//!   write separate from the comment insert; readers may briefly observe a
//!   comment the topic does not reflect yet.

use crate::model::content::{Content, ContentItem, ContentKind, KIND_PATH};
use crate::model::id::{Collection, Document, EntityId, Ref};
use crate::model::taxonomy::Node;
use crate::model::user::User;
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Denormalized pointer to the newest reply of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestReply {
    pub replier: Ref<User>,
    pub replied_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub content: Content,
    pub node: Ref<Node>,
    #[serde(default)]
    pub latest_reply: Option<LatestReply>,
}

impl Topic {
    pub fn new(
        node: Ref<Node>,
        title: impl Into<String>,
        markdown: impl Into<String>,
        author: Ref<User>,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: Content::new(ContentKind::Topic, title, markdown, author, created_at),
            node,
            latest_reply: None,
        }
    }

    /// Time of the last activity: newest reply, or creation.
    pub fn last_activity_at(&self) -> i64 {
        self.latest_reply
            .map_or(self.content.created_at, |reply| reply.replied_at)
    }
}

impl Document for Topic {
    const COLLECTION: Collection = Collection::Contents;
    const SCOPE: Option<(&'static str, &'static str)> = Some((KIND_PATH, "topic"));

    fn id(&self) -> EntityId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.content.validate()
    }
}

impl ContentItem for Topic {
    const KIND: ContentKind = ContentKind::Topic;
    type Owner = Node;

    fn envelope(&self) -> &Content {
        &self.content
    }

    fn owner(&self) -> Ref<Node> {
        self.node
    }
}
