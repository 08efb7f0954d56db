//! Vector store abstraction layer.
//!
//! A store holds named collections of (chunk, vector) records. Each
//! collection adopts the dimension of its first insert and rejects any other
//! length afterwards. [`StoreHandle`] adds the per-collection locking that
//! keeps readers away from a collection while it is being (re)ingested.

mod locks;
mod sqlite;

pub use locks::CollectionLocks;
pub use sqlite::SqliteVectorStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::StoreError;
use crate::models::{Chunk, ScoredChunk};

/// Summary of one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    /// `None` until the first chunks are added.
    pub dimension: Option<usize>,
    pub chunk_count: u64,
    pub created_at: String,
}

impl CollectionInfo {
    pub fn is_empty(&self) -> bool {
        self.chunk_count == 0
    }
}

/// Durable storage of chunks and vectors, partitioned by collection.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check that the backing store is reachable.
    async fn health_check(&self) -> Result<bool, StoreError>;

    /// Drop any collection of that name and create an empty one.
    async fn create_or_replace_collection(&self, name: &str) -> Result<CollectionInfo, StoreError>;

    /// Return the existing collection untouched, or create an empty one.
    async fn get_or_create_collection(&self, name: &str) -> Result<CollectionInfo, StoreError>;

    /// Information about a collection, `None` if absent.
    async fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>, StoreError>;

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, StoreError>;

    /// Remove a collection and its records. Absent collections are not an error.
    async fn delete_collection(&self, name: &str) -> Result<(), StoreError>;

    /// Append paired records atomically, creating the collection if needed.
    /// Fails with `DimensionMismatch`, leaving the collection unchanged, when
    /// a vector's length differs from the collection's dimension.
    async fn add_chunks(
        &self,
        name: &str,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), StoreError>;

    /// Insert paired records only if the collection is absent or empty,
    /// creating it in the same transaction. Returns `false`, writing nothing,
    /// when the collection already holds chunks.
    async fn fill_if_empty(
        &self,
        name: &str,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<bool, StoreError>;

    /// Replace the collection's entire contents in a single transaction.
    async fn replace_collection(
        &self,
        name: &str,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), StoreError>;

    /// The `k` most similar chunks by cosine similarity, best first, ties in
    /// ingestion order. Empty for an empty or missing collection.
    async fn query_similar(
        &self,
        name: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError>;
}

/// A shared store plus the locks that serialize ingestion against reads of
/// the same collection.
#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<dyn VectorStore>,
    locks: Arc<CollectionLocks>,
}

impl StoreHandle {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            locks: Arc::new(CollectionLocks::default()),
        }
    }

    pub fn store(&self) -> &dyn VectorStore {
        self.store.as_ref()
    }

    pub fn locks(&self) -> &CollectionLocks {
        &self.locks
    }
}

/// Open the SQLite store at `path`, wrapped in a handle.
pub fn open_store(path: &std::path::Path) -> Result<StoreHandle, StoreError> {
    let store = SqliteVectorStore::open(path)?;
    Ok(StoreHandle::new(Arc::new(store)))
}

/// Fail with `DimensionMismatch` unless every vector has `expected` entries.
pub(crate) fn check_dimensions(
    collection: &str,
    expected: usize,
    vectors: &[Vec<f32>],
) -> Result<(), StoreError> {
    match vectors.iter().find(|v| v.len() != expected) {
        Some(bad) => Err(StoreError::DimensionMismatch {
            collection: collection.to_string(),
            expected,
            actual: bad.len(),
        }),
        None => Ok(()),
    }
}
