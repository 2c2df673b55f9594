//! Typed helpers over the untyped document contract.

use crate::model::id::{Document, EntityId, Ref};
use crate::store::{lookup, DocumentStore, Filter, Query, StoreError, StoreResult, Update};
use serde_json::Value;

/// Encodes and decodes `Document` types around a `DocumentStore`.
///
/// Lookups honour `Document::SCOPE`: a stored document outside the scope is
/// reported as absent rather than decoded into the wrong type.
pub trait DocumentStoreExt: DocumentStore {
    fn load<T: Document>(&self, id: EntityId) -> StoreResult<Option<T>> {
        match self.get(T::COLLECTION, id)? {
            Some(doc) if in_scope::<T>(&doc) => decode(doc).map(Some),
            _ => Ok(None),
        }
    }

    /// Point lookup through a typed reference.
    fn resolve<T: Document>(&self, reference: Ref<T>) -> StoreResult<Option<T>> {
        self.load(reference.id())
    }

    fn find_as<T: Document>(&self, query: Query) -> StoreResult<Vec<T>> {
        let query = Query {
            filter: scoped::<T>(query.filter),
            ..query
        };
        self.find(T::COLLECTION, &query)?
            .into_iter()
            .map(decode)
            .collect()
    }

    fn count_as<T: Document>(&self, filter: Filter) -> StoreResult<u64> {
        self.count(T::COLLECTION, &scoped::<T>(filter))
    }

    fn insert_doc<T: Document>(&self, doc: &T) -> StoreResult<()> {
        self.insert(T::COLLECTION, doc.id(), &encode(doc)?)
    }

    /// Applies `update` and decodes the new state, `None` when absent.
    fn update_doc<T: Document>(&self, id: EntityId, update: &Update) -> StoreResult<Option<T>> {
        self.update(T::COLLECTION, id, update)?
            .map(decode)
            .transpose()
    }

    fn delete_doc<T: Document>(&self, id: EntityId) -> StoreResult<bool> {
        self.delete(T::COLLECTION, id)
    }
}

impl<S: DocumentStore + ?Sized> DocumentStoreExt for S {}

fn in_scope<T: Document>(doc: &Value) -> bool {
    match T::SCOPE {
        Some((path, tag)) => lookup(doc, path).and_then(Value::as_str) == Some(tag),
        None => true,
    }
}

fn scoped<T: Document>(filter: Filter) -> Filter {
    match T::SCOPE {
        Some((path, tag)) => filter.eq(path, tag),
        None => filter,
    }
}

fn decode<T: Document>(doc: Value) -> StoreResult<T> {
    serde_json::from_value(doc).map_err(|err| StoreError::Codec {
        collection: T::COLLECTION,
        message: err.to_string(),
    })
}

fn encode<T: Document>(doc: &T) -> StoreResult<Value> {
    serde_json::to_value(doc).map_err(|err| StoreError::Codec {
        collection: T::COLLECTION,
        message: err.to_string(),
    })
}
