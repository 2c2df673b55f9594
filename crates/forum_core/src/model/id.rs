//! Identifiers, collections and typed references.
//!
//! # Responsibility
//! - Name every collection the model persists into.
//! - Pair identifiers with the collection they point at (`Ref<T>`).
//!
//! # Invariants
//! - A `Ref<T>` serializes as the bare identifier; the collection is implied
//!   by `T` and never stored.
//! - Resolving a reference is always an explicit store lookup.

use crate::model::validation::ValidationError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use uuid::Uuid;

/// Stable identifier of every stored document.
pub type EntityId = Uuid;

/// Named document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Nodes,
    Contents,
    Comments,
    SiteCategories,
    ArticleCategories,
    PackageCategories,
    Status,
}

impl Collection {
    /// Storage name of the collection.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Nodes => "nodes",
            Self::Contents => "contents",
            Self::Comments => "comments",
            Self::SiteCategories => "sitecategories",
            Self::ArticleCategories => "articlecategories",
            Self::PackageCategories => "packagecategories",
            Self::Status => "status",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted entity.
pub trait Document: Serialize + DeserializeOwned {
    /// Collection the entity lives in.
    const COLLECTION: Collection;

    /// Extra `(path, tag)` equality every stored row of this type satisfies.
    ///
    /// Content kinds share one collection and use this to reject documents
    /// of another kind.
    const SCOPE: Option<(&'static str, &'static str)> = None;

    fn id(&self) -> EntityId;

    /// Checks write-time invariants.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Identifier of a `T` document.
pub struct Ref<T> {
    id: EntityId,
    marker: PhantomData<fn() -> T>,
}

impl<T> Ref<T> {
    pub const fn new(id: EntityId) -> Self {
        Self {
            id,
            marker: PhantomData,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }
}

impl<T: Document> Ref<T> {
    /// Reference pointing at `doc`.
    pub fn of(doc: &T) -> Self {
        Self::new(doc.id())
    }

    /// Collection this reference resolves against.
    pub fn collection(&self) -> Collection {
        T::COLLECTION
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Ref<T> {}

impl<T> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Ref<T> {}

impl<T> Hash for Ref<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T: Document> Debug for Ref<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ref({}:{})", T::COLLECTION, self.id)
    }
}

impl<T> Serialize for Ref<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.id.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Ref<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        EntityId::deserialize(deserializer).map(Self::new)
    }
}
