//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist JSON documents in the `documents` table, one row per document.
//! - Translate `Filter`/`Query` into `json_extract` predicates.
//!
//! # Invariants
//! - Field paths are validated before they are embedded in SQL text.
//! - Sorted queries break ties by insertion order (`seq ASC`).
//! - `update` runs read-modify-write inside one immediate transaction, so a
//!   single document is never half-updated; no transaction spans documents.

use crate::db::migrations::{current_user_version, latest_version};
use crate::model::id::{Collection, EntityId};
use crate::store::{check_path, DocumentStore, Filter, Query, StoreError, StoreResult, Update};
use log::{debug, warn};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Transaction, TransactionBehavior};
use serde_json::Value;

/// Document store over a migrated SQLite connection.
pub struct SqliteDocumentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentStore<'conn> {
    /// Wraps a connection opened through `db::open_db*`.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let actual_version = current_user_version(conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

impl DocumentStore for SqliteDocumentStore<'_> {
    fn get(&self, collection: Collection, id: EntityId) -> StoreResult<Option<Value>> {
        read_body(self.conn, collection, id)?
            .map(|body| decode_body(collection, &body))
            .transpose()
    }

    fn find(&self, collection: Collection, query: &Query) -> StoreResult<Vec<Value>> {
        let (mut sql, mut bind_values) = select_where("SELECT body", collection, &query.filter)?;

        match query.sort_desc.as_deref() {
            Some(path) => {
                let path = check_path(path)?;
                sql.push_str(&format!(
                    " ORDER BY json_extract(body, '$.{path}') DESC, seq ASC"
                ));
            }
            None => sql.push_str(" ORDER BY seq ASC"),
        }

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(SqlValue::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut docs = Vec::new();
        while let Some(row) = rows.next()? {
            let body: String = row.get(0)?;
            docs.push(decode_body(collection, &body)?);
        }
        Ok(docs)
    }

    fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<u64> {
        let (sql, bind_values) = select_where("SELECT COUNT(*)", collection, filter)?;
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn insert(&self, collection: Collection, id: EntityId, doc: &Value) -> StoreResult<()> {
        let body = encode_body(collection, doc)?;
        let result = self.conn.execute(
            "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, ?3);",
            params![collection.as_str(), id.to_string(), body],
        );
        match result {
            Ok(_) => Ok(()),
            Err(err) if is_constraint_violation(&err) => {
                debug!(
                    "event=store_insert module=store status=conflict collection={collection} id={id}"
                );
                Err(StoreError::Conflict { collection, id })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn update(
        &self,
        collection: Collection,
        id: EntityId,
        update: &Update,
    ) -> StoreResult<Option<Value>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let Some(body) = read_body(&tx, collection, id)? else {
            return Ok(None);
        };

        let mut doc = decode_body(collection, &body)?;
        update.apply(collection, &mut doc)?;
        let encoded = encode_body(collection, &doc)?;

        let result = tx.execute(
            "UPDATE documents SET body = ?3 WHERE collection = ?1 AND doc_id = ?2;",
            params![collection.as_str(), id.to_string(), encoded],
        );
        match result {
            Ok(_) => {}
            Err(err) if is_constraint_violation(&err) => {
                warn!(
                    "event=store_update module=store status=conflict collection={collection} id={id}"
                );
                return Err(StoreError::Conflict { collection, id });
            }
            Err(err) => return Err(err.into()),
        }
        tx.commit()?;
        Ok(Some(doc))
    }

    fn delete(&self, collection: Collection, id: EntityId) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2;",
            params![collection.as_str(), id.to_string()],
        )?;
        Ok(changed > 0)
    }
}

fn read_body(
    conn: &Connection,
    collection: Collection,
    id: EntityId,
) -> StoreResult<Option<String>> {
    let mut stmt = conn
        .prepare_cached("SELECT body FROM documents WHERE collection = ?1 AND doc_id = ?2;")?;
    let mut rows = stmt.query(params![collection.as_str(), id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(row.get(0)?));
    }
    Ok(None)
}

fn select_where(
    head: &str,
    collection: Collection,
    filter: &Filter,
) -> StoreResult<(String, Vec<SqlValue>)> {
    let mut sql = format!("{head} FROM documents WHERE collection = ?");
    let mut bind_values = vec![SqlValue::Text(collection.as_str().to_string())];

    for (path, expected) in filter.clauses() {
        let path = check_path(path)?;
        match json_to_sql(expected) {
            Some(value) => {
                sql.push_str(&format!(" AND json_extract(body, '$.{path}') = ?"));
                bind_values.push(value);
            }
            None if expected.is_null() => {
                sql.push_str(&format!(" AND json_extract(body, '$.{path}') IS NULL"));
            }
            None => {
                return Err(StoreError::Codec {
                    collection,
                    message: format!("filter on `{path}` must compare against a scalar"),
                });
            }
        }
    }

    Ok((sql, bind_values))
}

// `json_extract` yields booleans as 0/1 integers.
fn json_to_sql(value: &Value) -> Option<SqlValue> {
    match value {
        Value::Bool(flag) => Some(SqlValue::Integer(i64::from(*flag))),
        Value::Number(number) => number
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| number.as_f64().map(SqlValue::Real)),
        Value::String(text) => Some(SqlValue::Text(text.clone())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn decode_body(collection: Collection, body: &str) -> StoreResult<Value> {
    serde_json::from_str(body).map_err(|err| StoreError::Codec {
        collection,
        message: err.to_string(),
    })
}

fn encode_body(collection: Collection, doc: &Value) -> StoreResult<String> {
    serde_json::to_string(doc).map_err(|err| StoreError::Codec {
        collection,
        message: err.to_string(),
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}
