//! SQLite file backing the forum document store.
//!
//! The whole forum lives in one `documents` table: one row per document,
//! keyed by `(collection, doc_id)`, with the JSON body in `body` and the
//! insertion counter `seq` used as the tie-breaker of every sorted read.
//! Collection-specific lookups (usernames, content authors, comments per
//! content) are partial expression indexes over `json_extract(body, ...)`.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - `SqliteDocumentStore::try_new` refuses a connection whose schema
//!   version differs from the latest migration.
//! - The unique username index is the final arbiter of username clashes.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, DEFAULT_BUSY_TIMEOUT};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
