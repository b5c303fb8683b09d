//! In-memory collaborators for tests and local development.
//!
//! Both stores are cheap to clone; clones share the same underlying data so
//! a test can seed a store, hand a clone to the application, and inspect the
//! result afterwards.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::documents::{ensure_id, matches_filter, Document, DocumentError, DocumentStore};
use crate::storage::{ObjectStore, StorageError};

/// Object store backed by a sorted map, so listing order is lexicographic
/// like a GCS bucket.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object synchronously.
    pub fn insert(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.objects.write().insert(path.into(), bytes.into());
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.objects.read().contains_key(path))
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<String>, StorageError> {
        let objects = self.objects.read();
        Ok(objects
            .range(prefix.to_string()..)
            .next()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, _)| name.clone()))
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        self.objects.write().insert(path.to_string(), bytes);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .objects
            .read()
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(name, _)| name.clone())
            .collect())
    }
}

/// Document store keeping each collection as an insertion-ordered vector.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every document in `collection`.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<Option<Document>, DocumentError> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| matches_filter(d, filter)).cloned()))
    }

    async fn insert_one(
        &self,
        collection: &str,
        mut document: Document,
    ) -> Result<String, DocumentError> {
        let id = ensure_id(&mut document);
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(id)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        set: Document,
    ) -> Result<bool, DocumentError> {
        let mut collections = self.collections.write();
        let Some(target) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| matches_filter(d, filter)))
        else {
            return Ok(false);
        };
        target.extend(set);
        Ok(true)
    }
}
