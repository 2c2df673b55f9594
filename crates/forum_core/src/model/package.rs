//! Software package listing.

use crate::model::content::{Content, ContentItem, ContentKind, KIND_PATH};
use crate::model::id::{Collection, Document, EntityId, Ref};
use crate::model::taxonomy::PackageCategory;
use crate::model::user::User;
use crate::model::validation::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub content: Content,
    pub category: Ref<PackageCategory>,
    /// Project home page or repository.
    pub url: String,
}

impl Package {
    pub fn new(
        category: Ref<PackageCategory>,
        name: impl Into<String>,
        url: impl Into<String>,
        markdown: impl Into<String>,
        author: Ref<User>,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: Content::new(ContentKind::Package, name, markdown, author, created_at),
            category,
            url: url.into(),
        }
    }
}

impl Document for Package {
    const COLLECTION: Collection = Collection::Contents;
    const SCOPE: Option<(&'static str, &'static str)> = Some((KIND_PATH, "package"));

    fn id(&self) -> EntityId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.content.validate()?;
        require_text("package", "url", &self.url)
    }
}

impl ContentItem for Package {
    const KIND: ContentKind = ContentKind::Package;
    type Owner = PackageCategory;

    fn envelope(&self) -> &Content {
        &self.content
    }

    fn owner(&self) -> Ref<PackageCategory> {
        self.category
    }
}
