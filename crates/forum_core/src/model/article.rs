//! Article, optionally reprinted from an external source.

use crate::model::content::{Content, ContentItem, ContentKind, KIND_PATH};
use crate::model::id::{Collection, Document, EntityId, Ref};
use crate::model::taxonomy::ArticleCategory;
use crate::model::user::User;
use crate::model::validation::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a reprinted article originally appeared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    pub source: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub content: Content,
    pub category: Ref<ArticleCategory>,
    #[serde(default)]
    pub original: Option<Attribution>,
}

impl Article {
    pub fn new(
        category: Ref<ArticleCategory>,
        title: impl Into<String>,
        markdown: impl Into<String>,
        author: Ref<User>,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: Content::new(ContentKind::Article, title, markdown, author, created_at),
            category,
            original: None,
        }
    }

    pub fn is_reprint(&self) -> bool {
        self.original.is_some()
    }
}

impl Document for Article {
    const COLLECTION: Collection = Collection::Contents;
    const SCOPE: Option<(&'static str, &'static str)> = Some((KIND_PATH, "article"));

    fn id(&self) -> EntityId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.content.validate()?;
        if let Some(original) = &self.original {
            require_text("article", "original.source", &original.source)?;
            require_text("article", "original.url", &original.url)?;
        }
        Ok(())
    }
}

impl ContentItem for Article {
    const KIND: ContentKind = ContentKind::Article;
    type Owner = ArticleCategory;

    fn envelope(&self) -> &Content {
        &self.content
    }

    fn owner(&self) -> Ref<ArticleCategory> {
        self.category
    }
}
