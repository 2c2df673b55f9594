//! Taxonomy entities that content items belong to.
//!
//! # Invariants
//! - Counted taxonomies (`Node`, `PackageCategory`) store the number of
//!   member items as a denormalized hint. Drift is tolerated and repaired
//!   by recount; readers must not assume the count is exact.
//! - Deleting a taxonomy entity never touches its members; their owner
//!   references dangle and resolve to not-found.

use crate::model::article::Article;
use crate::model::content::ContentItem;
use crate::model::id::{Collection, Document, EntityId};
use crate::model::package::Package;
use crate::model::site::Site;
use crate::model::topic::Topic;
use crate::model::validation::{require_slug, require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A categorizing entity with a single member content kind.
pub trait Taxonomy: Document {
    type Member: ContentItem<Owner = Self>;

    /// Path of the owner reference inside member documents.
    const MEMBER_PATH: &'static str;

    /// Path of the denormalized member count, when the entity keeps one.
    const COUNT_PATH: Option<&'static str>;

    fn name(&self) -> &str;
}

/// Discussion node grouping topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "_id")]
    pub id: EntityId,
    /// Short url-safe identifier, e.g. `general`.
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub topic_count: u64,
}

impl Node {
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            slug: slug.into(),
            name: name.into(),
            description: String::new(),
            topic_count: 0,
        }
    }
}

impl Document for Node {
    const COLLECTION: Collection = Collection::Nodes;

    fn id(&self) -> EntityId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_slug(&self.slug)?;
        require_text("node", "name", &self.name)
    }
}

impl Taxonomy for Node {
    type Member = Topic;
    const MEMBER_PATH: &'static str = "node";
    const COUNT_PATH: Option<&'static str> = Some("topic_count");

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteCategory {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub name: String,
}

impl SiteCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

impl Document for SiteCategory {
    const COLLECTION: Collection = Collection::SiteCategories;

    fn id(&self) -> EntityId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("site_category", "name", &self.name)
    }
}

impl Taxonomy for SiteCategory {
    type Member = Site;
    const MEMBER_PATH: &'static str = "category";
    const COUNT_PATH: Option<&'static str> = None;

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleCategory {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub name: String,
}

impl ArticleCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

impl Document for ArticleCategory {
    const COLLECTION: Collection = Collection::ArticleCategories;

    fn id(&self) -> EntityId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("article_category", "name", &self.name)
    }
}

impl Taxonomy for ArticleCategory {
    type Member = Article;
    const MEMBER_PATH: &'static str = "category";
    const COUNT_PATH: Option<&'static str> = None;

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageCategory {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub package_count: u64,
}

impl PackageCategory {
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            slug: slug.into(),
            name: name.into(),
            package_count: 0,
        }
    }
}

impl Document for PackageCategory {
    const COLLECTION: Collection = Collection::PackageCategories;

    fn id(&self) -> EntityId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_slug(&self.slug)?;
        require_text("package_category", "name", &self.name)
    }
}

impl Taxonomy for PackageCategory {
    type Member = Package;
    const MEMBER_PATH: &'static str = "category";
    const COUNT_PATH: Option<&'static str> = Some("package_count");

    fn name(&self) -> &str {
        &self.name
    }
}
