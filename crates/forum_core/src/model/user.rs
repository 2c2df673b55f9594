//! User account and social graph.
//!
//! # Invariants
//! - `username` is unique across the `users` collection (store index).
//! - `follow` and `fans` are inverse relations maintained by the follow
//!   operations, which write both sides; the store does not enforce it.
//! - `index` is assigned once at registration and never changes. Indexes
//!   are unique and increasing; a failed registration can skip one.

use crate::model::id::{Collection, Document, EntityId};
use crate::model::validation::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = EntityId;

/// Optional public profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weibo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub username: String,
    /// Opaque password hash; hashing happens outside the model.
    pub password: String,
    pub email: String,
    #[serde(flatten)]
    pub profile: Profile,
    pub joined_at: i64,
    /// Usernames this user follows, in follow order.
    #[serde(default)]
    pub follow: Vec<String>,
    /// Usernames following this user, in follow order.
    #[serde(default)]
    pub fans: Vec<String>,
    pub is_superuser: bool,
    pub is_active: bool,
    #[serde(default)]
    pub validate_code: Option<String>,
    #[serde(default)]
    pub reset_code: Option<String>,
    /// Dense registration ordinal, used for display numbering.
    pub index: u64,
}

impl User {
    /// Creates an inactive account awaiting validation.
    pub fn new(
        username: impl Into<String>,
        password_hash: impl Into<String>,
        email: impl Into<String>,
        index: u64,
        joined_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password: password_hash.into(),
            email: email.into(),
            profile: Profile::default(),
            joined_at,
            follow: Vec::new(),
            fans: Vec::new(),
            is_superuser: false,
            is_active: false,
            validate_code: Some(Uuid::new_v4().simple().to_string()),
            reset_code: None,
            index,
        }
    }

    /// Whether `who` appears in this user's fans.
    pub fn is_followed_by(&self, who: &str) -> bool {
        self.fans.iter().any(|username| username == who)
    }

    /// Whether this user follows `who`.
    pub fn is_fans(&self, who: &str) -> bool {
        self.follow.iter().any(|username| username == who)
    }
}

impl Document for User {
    const COLLECTION: Collection = Collection::Users;

    fn id(&self) -> EntityId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("user", "username", &self.username)?;
        if self
            .username
            .chars()
            .any(|ch| ch.is_whitespace() || ch.is_control())
        {
            return Err(ValidationError::InvalidUsername(self.username.clone()));
        }
        require_text("user", "password", &self.password)?;
        require_text("user", "email", &self.email)
    }
}
