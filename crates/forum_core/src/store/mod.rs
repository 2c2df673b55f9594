//! Document store contract and query/update vocabulary.
//!
//! # Responsibility
//! - Define the persistence seam every service talks to (`DocumentStore`).
//! - Describe equality filters, "latest N" queries and field-level updates
//!   independently of the backing engine.
//!
//! # Invariants
//! - Every operation touches at most one collection.
//! - `update` is atomic for the single document it targets; nothing spans
//!   documents.
//! - Backend failures surface as `StoreError::Unavailable` and are never
//!   retried here.

use crate::db::DbError;
use crate::model::id::{Collection, EntityId};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod sqlite;
mod typed;

pub use sqlite::SqliteDocumentStore;
pub use typed::DocumentStoreExt;

static FIELD_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("valid field path regex")
});

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by document store implementations.
#[derive(Debug)]
pub enum StoreError {
    /// The backing engine failed to answer.
    Unavailable(DbError),
    /// Connection schema is not at the version this build expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// A uniqueness constraint rejected the write.
    Conflict {
        collection: Collection,
        id: EntityId,
    },
    /// A document could not be encoded, decoded or updated as requested.
    Codec {
        collection: Collection,
        message: String,
    },
    /// A field path is not a dotted identifier.
    InvalidPath(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(err) => write!(f, "document store unavailable: {err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "document store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::Conflict { collection, id } => {
                write!(f, "write conflict in `{collection}` for document {id}")
            }
            Self::Codec {
                collection,
                message,
            } => write!(f, "invalid `{collection}` document: {message}"),
            Self::InvalidPath(path) => write!(f, "invalid field path `{path}`"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Unavailable(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Unavailable(DbError::Sqlite(value))
    }
}

/// Validates a dotted field path such as `content.created_by`.
pub fn check_path(path: &str) -> StoreResult<&str> {
    if FIELD_PATH_RE.is_match(path) {
        Ok(path)
    } else {
        Err(StoreError::InvalidPath(path.to_string()))
    }
}

/// Encodes a value for use in a `Filter` or `Update`.
pub fn encode_field<T: Serialize>(collection: Collection, value: &T) -> StoreResult<Value> {
    serde_json::to_value(value).map_err(|err| codec_error(collection, err.to_string()))
}

/// Conjunction of field equality predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `path == value`.
    pub fn eq(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.clauses.push((path.to_string(), value.into()));
        self
    }

    /// Adds `path == id`, comparing against the stored identifier string.
    pub fn eq_id(self, path: &str, id: EntityId) -> Self {
        self.eq(path, id.to_string())
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Whether `doc` satisfies every clause.
    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses
            .iter()
            .all(|(path, expected)| lookup(doc, path) == Some(expected))
    }
}

/// Filtered lookup with optional descending sort and limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Filter,
    /// Sort field, descending. Ties keep insertion order.
    pub sort_desc: Option<String>,
    pub limit: Option<u32>,
}

impl Query {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            sort_desc: None,
            limit: None,
        }
    }

    /// Newest-first view: `sort_desc(path)` plus `limit`.
    pub fn latest(filter: Filter, path: &str, limit: u32) -> Self {
        Self {
            filter,
            sort_desc: Some(path.to_string()),
            limit: Some(limit),
        }
    }
}

/// One field-level mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    Set(String, Value),
    Unset(String),
    /// Integer increment; the result saturates at zero because every counter
    /// in this model is non-negative.
    Inc(String, i64),
    /// Appends to an array unless an equal element is present.
    AddToSet(String, Value),
    /// Removes every equal element from an array.
    Pull(String, Value),
}

/// Ordered set of mutations applied to one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Set(path.to_string(), value.into()));
        self
    }

    pub fn unset(mut self, path: &str) -> Self {
        self.ops.push(UpdateOp::Unset(path.to_string()));
        self
    }

    pub fn inc(mut self, path: &str, delta: i64) -> Self {
        self.ops.push(UpdateOp::Inc(path.to_string(), delta));
        self
    }

    pub fn add_to_set(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.ops
            .push(UpdateOp::AddToSet(path.to_string(), value.into()));
        self
    }

    pub fn pull(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Pull(path.to_string(), value.into()));
        self
    }

    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    /// Applies every op to `doc` in order.
    ///
    /// # Errors
    /// - `InvalidPath` for malformed paths or paths crossing non-objects.
    /// - `Codec` when `Inc` targets a non-integer or `AddToSet`/`Pull`
    ///   target a non-array.
    pub fn apply(&self, collection: Collection, doc: &mut Value) -> StoreResult<()> {
        for op in &self.ops {
            match op {
                UpdateOp::Set(path, value) => {
                    *slot(doc, path)? = value.clone();
                }
                UpdateOp::Unset(path) => {
                    check_path(path)?;
                    let (parent, key) = split_parent(path);
                    let container = match parent {
                        Some(parent) => lookup_mut(doc, parent),
                        None => Some(&mut *doc),
                    };
                    if let Some(Value::Object(map)) = container {
                        map.remove(key);
                    }
                }
                UpdateOp::Inc(path, delta) => {
                    let target = slot(doc, path)?;
                    let current = match &*target {
                        Value::Null => 0,
                        Value::Number(number) => number.as_i64().ok_or_else(|| {
                            codec_error(collection, format!("`{path}` is not an integer"))
                        })?,
                        _ => {
                            return Err(codec_error(
                                collection,
                                format!("`{path}` is not an integer"),
                            ))
                        }
                    };
                    *target = Value::from(current.saturating_add(*delta).max(0));
                }
                UpdateOp::AddToSet(path, value) => {
                    let items = array_slot(collection, doc, path)?;
                    if !items.contains(value) {
                        items.push(value.clone());
                    }
                }
                UpdateOp::Pull(path, value) => {
                    let items = array_slot(collection, doc, path)?;
                    items.retain(|item| item != value);
                }
            }
        }
        Ok(())
    }
}

/// Persistence collaborator for the forum model.
///
/// Every method takes `&self`, so services share one handle within a
/// thread. `SqliteDocumentStore` borrows a `rusqlite::Connection`, which is
/// not `Sync`; concurrent workers each open their own connection to the
/// same database file and wrap it in their own store.
pub trait DocumentStore {
    /// Point lookup by identifier.
    fn get(&self, collection: Collection, id: EntityId) -> StoreResult<Option<Value>>;

    /// Filtered lookup. Without `sort_desc`, results follow insertion order.
    fn find(&self, collection: Collection, query: &Query) -> StoreResult<Vec<Value>>;

    fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<u64>;

    /// Inserts a new document; an existing id is a `Conflict`.
    fn insert(&self, collection: Collection, id: EntityId, doc: &Value) -> StoreResult<()>;

    /// Applies `update` to one document and returns its new state, or `None`
    /// when no document has that id.
    fn update(
        &self,
        collection: Collection,
        id: EntityId,
        update: &Update,
    ) -> StoreResult<Option<Value>>;

    /// Removes one document; returns whether it existed.
    fn delete(&self, collection: Collection, id: EntityId) -> StoreResult<bool>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn get(&self, collection: Collection, id: EntityId) -> StoreResult<Option<Value>> {
        (**self).get(collection, id)
    }

    fn find(&self, collection: Collection, query: &Query) -> StoreResult<Vec<Value>> {
        (**self).find(collection, query)
    }

    fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<u64> {
        (**self).count(collection, filter)
    }

    fn insert(&self, collection: Collection, id: EntityId, doc: &Value) -> StoreResult<()> {
        (**self).insert(collection, id, doc)
    }

    fn update(
        &self,
        collection: Collection,
        id: EntityId,
        update: &Update,
    ) -> StoreResult<Option<Value>> {
        (**self).update(collection, id, update)
    }

    fn delete(&self, collection: Collection, id: EntityId) -> StoreResult<bool> {
        (**self).delete(collection, id)
    }
}

/// Reads the value at a dotted path.
pub fn lookup<'doc>(doc: &'doc Value, path: &str) -> Option<&'doc Value> {
    path.split('.')
        .try_fold(doc, |current, key| current.as_object()?.get(key))
}

fn lookup_mut<'doc>(doc: &'doc mut Value, path: &str) -> Option<&'doc mut Value> {
    path.split('.')
        .try_fold(doc, |current, key| current.as_object_mut()?.get_mut(key))
}

fn split_parent(path: &str) -> (Option<&str>, &str) {
    match path.rsplit_once('.') {
        Some((parent, key)) => (Some(parent), key),
        None => (None, path),
    }
}

// Walks to `path`, creating missing intermediate objects and a null leaf.
fn slot<'doc>(doc: &'doc mut Value, path: &str) -> StoreResult<&'doc mut Value> {
    check_path(path)?;
    let mut current = doc;
    for key in path.split('.') {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map.entry(key.to_string()).or_insert(Value::Null),
            _ => return Err(StoreError::InvalidPath(path.to_string())),
        };
    }
    Ok(current)
}

fn array_slot<'doc>(
    collection: Collection,
    doc: &'doc mut Value,
    path: &str,
) -> StoreResult<&'doc mut Vec<Value>> {
    let target = slot(doc, path)?;
    if target.is_null() {
        *target = Value::Array(Vec::new());
    }
    match target {
        Value::Array(items) => Ok(items),
        _ => Err(codec_error(collection, format!("`{path}` is not an array"))),
    }
}

fn codec_error(collection: Collection, message: String) -> StoreError {
    StoreError::Codec {
        collection,
        message,
    }
}
