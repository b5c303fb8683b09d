//! # Document Database Collaborator
//!
//! User accounts live in a document collection. The service only needs
//! single-document lookups, inserts and field updates, so [`DocumentStore`]
//! exposes exactly those. Filters match on top-level field equality.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// A JSON document. The `_id` field carries the document's identifier.
pub type Document = Map<String, Value>;

/// Name of the identifier field.
pub const ID_FIELD: &str = "_id";

/// Errors surfaced by a document database backend.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The backend failed (connection, query, constraint).
    #[error("document store failure: {0}")]
    Backend(String),

    /// A stored document did not have the expected shape.
    #[error("malformed document in {collection}: {reason}")]
    Malformed { collection: String, reason: String },
}

/// Operations the service needs from the document database.
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Return the first document in `collection` matching every field of `filter`.
    async fn find_one(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<Option<Document>, DocumentError>;

    /// Insert `document`, assigning an `_id` when absent. Returns the id.
    async fn insert_one(&self, collection: &str, document: Document)
        -> Result<String, DocumentError>;

    /// Merge `set` into the first document matching `filter`.
    ///
    /// Returns `false` when nothing matched.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        set: Document,
    ) -> Result<bool, DocumentError>;
}

/// Whether `document` carries every field of `filter` with an equal value.
pub fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(field, expected)| document.get(field) == Some(expected))
}

/// Build a single-field equality filter.
pub fn filter_eq(field: &str, value: impl Into<Value>) -> Document {
    let mut filter = Document::new();
    filter.insert(field.to_string(), value.into());
    filter
}

/// Ensure `document` has an `_id`, generating a UUID when absent.
pub fn ensure_id(document: &mut Document) -> String {
    match document.get(ID_FIELD) {
        Some(Value::String(id)) => id.clone(),
        Some(other) => other.to_string(),
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            document.insert(ID_FIELD.to_string(), Value::String(id.clone()));
            id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn filter_matches_on_every_field() {
        let d = doc(json!({"email": "a@b.c", "is_verified": true, "promo": false}));
        assert!(matches_filter(&d, &filter_eq("email", "a@b.c")));
        assert!(matches_filter(
            &d,
            &doc(json!({"email": "a@b.c", "is_verified": true}))
        ));
        assert!(!matches_filter(
            &d,
            &doc(json!({"email": "a@b.c", "is_verified": false}))
        ));
        assert!(!matches_filter(&d, &filter_eq("missing", 1)));
    }

    #[test]
    fn empty_filter_matches_anything() {
        assert!(matches_filter(&doc(json!({"x": 1})), &Document::new()));
    }

    #[test]
    fn ensure_id_keeps_existing_id() {
        let mut d = doc(json!({"_id": "abc"}));
        assert_eq!(ensure_id(&mut d), "abc");
    }

    #[test]
    fn ensure_id_generates_missing_id() {
        let mut d = doc(json!({"email": "a@b.c"}));
        let id = ensure_id(&mut d);
        assert_eq!(d.get(ID_FIELD), Some(&Value::String(id.clone())));
        assert_eq!(id.len(), 36);
    }
}
