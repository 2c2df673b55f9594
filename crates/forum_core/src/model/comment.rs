//! Reply attached to one content item.
//!
//! Comments are stored in their own collection and point at their owner
//! through `content_id`; the owner never embeds them.

use crate::markup::render_markdown;
use crate::model::content::{ContentId, ContentKind, Edited};
use crate::model::id::{Collection, Document, EntityId, Ref};
use crate::model::user::User;
use crate::model::validation::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: EntityId,
    /// Kind of the owning content. In practice always `topic`.
    pub kind: ContentKind,
    pub content_id: ContentId,
    pub markdown: String,
    pub html: String,
    pub created_by: Ref<User>,
    pub created_at: i64,
    #[serde(default)]
    pub updated: Option<Edited>,
}

impl Comment {
    pub fn new(
        kind: ContentKind,
        content_id: ContentId,
        markdown: impl Into<String>,
        author: Ref<User>,
        created_at: i64,
    ) -> Self {
        let markdown = markdown.into();
        Self {
            id: Uuid::new_v4(),
            kind,
            content_id,
            html: render_markdown(&markdown),
            markdown,
            created_by: author,
            created_at,
            updated: None,
        }
    }

    /// Replaces the source, re-rendering the cached html.
    pub fn revise(&mut self, markdown: impl Into<String>, editor: Ref<User>, at: i64) {
        self.markdown = markdown.into();
        self.html = render_markdown(&self.markdown);
        self.updated = Some(Edited { by: editor, at });
    }
}

impl Document for Comment {
    const COLLECTION: Collection = Collection::Comments;

    fn id(&self) -> EntityId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("comment", "markdown", &self.markdown)
    }
}
