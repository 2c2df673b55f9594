//! Shared content envelope and kind-agnostic content loading.
//!
//! # Responsibility
//! - Define the fields every publishable kind carries (`Content`).
//! - Provide the `ContentItem` seam that concrete kinds implement.
//! - Decode a stored content document into the right kind (`AnyContent`).
//!
//! # Invariants
//! - `html` is always the rendering of `markdown`; it is recomputed on every
//!   source change and never set independently.
//! - `created_at`/`created_by` never change after creation.
//! - `updated` is absent until the first edit.
//! - `comment_count` and `hits` are denormalized and may drift; `hits` is
//!   only ever incremented.

use crate::markup::render_markdown;
use crate::model::article::Article;
use crate::model::id::{Collection, Document, EntityId, Ref};
use crate::model::package::Package;
use crate::model::site::Site;
use crate::model::topic::Topic;
use crate::model::user::User;
use crate::model::validation::{require_text, ValidationError};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt::{Display, Formatter};

pub type ContentId = EntityId;

/// Storage path of the kind discriminant inside a content document.
pub const KIND_PATH: &str = "content.kind";

/// Discriminant of publishable content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Topic,
    Article,
    Site,
    Package,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::Article => "article",
            Self::Site => "site",
            Self::Package => "package",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "topic" => Some(Self::Topic),
            "article" => Some(Self::Article),
            "site" => Some(Self::Site),
            "package" => Some(Self::Package),
            _ => None,
        }
    }
}

impl Display for ContentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who last edited a document and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edited {
    pub by: Ref<User>,
    pub at: i64,
}

/// Envelope embedded under `content` in every content document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub kind: ContentKind,
    pub title: String,
    pub markdown: String,
    pub html: String,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub hits: u64,
    pub created_at: i64,
    pub created_by: Ref<User>,
    #[serde(default)]
    pub updated: Option<Edited>,
}

impl Content {
    pub fn new(
        kind: ContentKind,
        title: impl Into<String>,
        markdown: impl Into<String>,
        created_by: Ref<User>,
        created_at: i64,
    ) -> Self {
        let markdown = markdown.into();
        Self {
            kind,
            title: title.into(),
            html: render_markdown(&markdown),
            markdown,
            comment_count: 0,
            hits: 0,
            created_at,
            created_by,
            updated: None,
        }
    }

    /// Replaces title and source, re-rendering the cached html.
    pub fn revise(
        &mut self,
        title: impl Into<String>,
        markdown: impl Into<String>,
        editor: Ref<User>,
        at: i64,
    ) {
        self.title = title.into();
        self.markdown = markdown.into();
        self.html = render_markdown(&self.markdown);
        self.updated = Some(Edited { by: editor, at });
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(self.kind.as_str(), "title", &self.title)
    }
}

/// A concrete content kind stored in the `contents` collection.
pub trait ContentItem: Document {
    const KIND: ContentKind;

    /// Taxonomy entity the item belongs to.
    type Owner: Document;

    fn envelope(&self) -> &Content;

    fn owner(&self) -> Ref<Self::Owner>;
}

/// Content document of any kind, decoded through its `content.kind` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyContent {
    Topic(Topic),
    Article(Article),
    Site(Site),
    Package(Package),
}

impl AnyContent {
    pub fn kind(&self) -> ContentKind {
        self.envelope().kind
    }

    pub fn envelope(&self) -> &Content {
        match self {
            Self::Topic(item) => item.envelope(),
            Self::Article(item) => item.envelope(),
            Self::Site(item) => item.envelope(),
            Self::Package(item) => item.envelope(),
        }
    }

    pub fn into_topic(self) -> Option<Topic> {
        match self {
            Self::Topic(topic) => Some(topic),
            _ => None,
        }
    }
}

impl Document for AnyContent {
    const COLLECTION: Collection = Collection::Contents;

    fn id(&self) -> EntityId {
        match self {
            Self::Topic(item) => item.id,
            Self::Article(item) => item.id,
            Self::Site(item) => item.id,
            Self::Package(item) => item.id,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Topic(item) => item.validate(),
            Self::Article(item) => item.validate(),
            Self::Site(item) => item.validate(),
            Self::Package(item) => item.validate(),
        }
    }
}

impl Serialize for AnyContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Topic(item) => item.serialize(serializer),
            Self::Article(item) => item.serialize(serializer),
            Self::Site(item) => item.serialize(serializer),
            Self::Package(item) => item.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for AnyContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let tag = value
            .pointer("/content/kind")
            .and_then(Value::as_str)
            .ok_or_else(|| D::Error::missing_field(KIND_PATH))?;
        let kind = ContentKind::parse(tag)
            .ok_or_else(|| D::Error::custom(format!("unknown content kind `{tag}`")))?;

        let decoded = match kind {
            ContentKind::Topic => serde_json::from_value(value).map(Self::Topic),
            ContentKind::Article => serde_json::from_value(value).map(Self::Article),
            ContentKind::Site => serde_json::from_value(value).map(Self::Site),
            ContentKind::Package => serde_json::from_value(value).map(Self::Package),
        };
        decoded.map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::{AnyContent, Content, ContentKind};
    use crate::model::article::Article;
    use crate::model::id::Ref;
    use crate::model::topic::Topic;
    use uuid::Uuid;

    #[test]
    fn new_envelope_renders_html_and_starts_unedited() {
        let author = Ref::new(Uuid::new_v4());
        let content = Content::new(ContentKind::Topic, "Hello", "**hi**", author, 10);

        assert_eq!(content.html, "<p><strong>hi</strong></p>");
        assert_eq!(content.comment_count, 0);
        assert_eq!(content.hits, 0);
        assert!(content.updated.is_none());
    }

    #[test]
    fn revise_rerenders_and_records_editor() {
        let author = Ref::new(Uuid::new_v4());
        let editor = Ref::new(Uuid::new_v4());
        let mut content = Content::new(ContentKind::Article, "Old", "old", author, 10);

        content.revise("New", "`new`", editor, 20);

        assert_eq!(content.title, "New");
        assert_eq!(content.html, "<p><code>new</code></p>");
        assert_eq!(content.created_by, author);
        assert_eq!(content.created_at, 10);
        let edited = content.updated.expect("edit should be recorded");
        assert_eq!(edited.by, editor);
        assert_eq!(edited.at, 20);
    }

    #[test]
    fn any_content_dispatches_on_the_envelope_tag() {
        let author = Ref::new(Uuid::new_v4());
        let topic = Topic::new(Ref::new(Uuid::new_v4()), "t", "body", author, 1);
        let article = Article::new(Ref::new(Uuid::new_v4()), "a", "body", author, 2);

        let topic_json = serde_json::to_value(&topic).unwrap();
        assert_eq!(topic_json["content"]["kind"], "topic");
        let decoded: AnyContent = serde_json::from_value(topic_json).unwrap();
        assert_eq!(decoded.kind(), ContentKind::Topic);
        assert_eq!(decoded.into_topic(), Some(topic));

        let decoded: AnyContent =
            serde_json::from_value(serde_json::to_value(&article).unwrap()).unwrap();
        assert_eq!(decoded.kind(), ContentKind::Article);
        assert!(decoded.into_topic().is_none());
    }

    #[test]
    fn any_content_rejects_unknown_kind() {
        let json = serde_json::json!({ "_id": Uuid::nil(), "content": { "kind": "poll" } });
        let err = serde_json::from_value::<AnyContent>(json).unwrap_err();
        assert!(err.to_string().contains("poll"));
    }
}
