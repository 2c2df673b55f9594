//! Curated link directory entry.

use crate::model::content::{Content, ContentItem, ContentKind, KIND_PATH};
use crate::model::id::{Collection, Document, EntityId, Ref};
use crate::model::taxonomy::SiteCategory;
use crate::model::user::User;
use crate::model::validation::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub content: Content,
    pub url: String,
    pub category: Ref<SiteCategory>,
}

impl Site {
    pub fn new(
        category: Ref<SiteCategory>,
        title: impl Into<String>,
        url: impl Into<String>,
        markdown: impl Into<String>,
        author: Ref<User>,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: Content::new(ContentKind::Site, title, markdown, author, created_at),
            url: url.into(),
            category,
        }
    }
}

impl Document for Site {
    const COLLECTION: Collection = Collection::Contents;
    const SCOPE: Option<(&'static str, &'static str)> = Some((KIND_PATH, "site"));

    fn id(&self) -> EntityId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.content.validate()?;
        require_text("site", "url", &self.url)
    }
}

impl ContentItem for Site {
    const KIND: ContentKind = ContentKind::Site;
    type Owner = SiteCategory;

    fn envelope(&self) -> &Content {
        &self.content
    }

    fn owner(&self) -> Ref<SiteCategory> {
        self.category
    }
}
