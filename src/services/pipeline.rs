//! Ingestion: load, chunk, embed, commit.
//!
//! Nothing reaches the store until every chunk of the document has a vector.
//! The commit is then a single store transaction, so a failed, aborted or
//! dropped run leaves the collection exactly as it was, or absent if it did
//! not exist before.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use super::chunker::TextChunker;
use super::embedding::Embedder;
use super::vector_store::StoreHandle;
use crate::error::{EmbeddingError, IngestError};
use crate::models::{Chunk, Document, IngestPolicy, SourceLocator};
use crate::sources::DocumentLoader;

/// Called after each embedded batch with `(embedded, total)` chunk counts.
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

const DEFAULT_BATCH_SIZE: usize = 8;

/// Cloneable flag that stops an ingestion run at the next batch boundary.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestOutcome {
    Ingested,
    /// ReuseIfPresent found the collection already populated.
    Skipped,
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub collection: String,
    pub source: String,
    pub policy: IngestPolicy,
    pub outcome: IngestOutcome,
    /// Chunks the collection holds after the run.
    pub chunk_count: u64,
    pub dimension: Option<usize>,
    pub duration_ms: u64,
}

pub struct IngestionPipeline {
    store: StoreHandle,
    embedder: Arc<dyn Embedder>,
    chunker: TextChunker,
    policy: IngestPolicy,
    batch_size: usize,
    progress: Option<ProgressFn>,
    abort: AbortHandle,
}

impl IngestionPipeline {
    pub fn new(store: StoreHandle, embedder: Arc<dyn Embedder>, chunker: TextChunker) -> Self {
        Self {
            store,
            embedder,
            chunker,
            policy: IngestPolicy::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            progress: None,
            abort: AbortHandle::new(),
        }
    }

    pub fn with_policy(mut self, policy: IngestPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_abort_handle(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn policy(&self) -> IngestPolicy {
        self.policy
    }

    /// Chunk a document without embedding or storing anything.
    pub fn chunk_preview(&self, document: &Document) -> Vec<Chunk> {
        self.chunker.chunk(document)
    }

    /// Load `source` and ingest it into `collection`.
    ///
    /// A load failure surfaces before the store is touched.
    pub async fn ingest(
        &self,
        loader: &dyn DocumentLoader,
        source: &SourceLocator,
        collection: &str,
    ) -> Result<IngestReport, IngestError> {
        let document = loader.load(source).await?;
        self.ingest_document(&document, collection).await
    }

    /// Ingest an already loaded document into `collection` under the
    /// pipeline's policy. Holds the collection's write lock for the whole run.
    pub async fn ingest_document(
        &self,
        document: &Document,
        collection: &str,
    ) -> Result<IngestReport, IngestError> {
        let start = Instant::now();
        let _guard = self.store.locks().write(collection).await;
        let store = self.store.store();

        tracing::info!(
            "Ingesting {} into '{}' (policy: {})",
            document.source,
            collection,
            self.policy
        );

        let outcome = match self.policy {
            IngestPolicy::Overwrite => {
                let (chunks, vectors) = self.embed_document(document).await?;
                self.check_abort(collection)?;
                store.replace_collection(collection, chunks, vectors).await?;
                IngestOutcome::Ingested
            }
            IngestPolicy::ReuseIfPresent => {
                let existing = store.collection_info(collection).await?;
                if let Some(info) = existing.filter(|i| !i.is_empty()) {
                    self.log_skip(collection, info.chunk_count);
                    IngestOutcome::Skipped
                } else {
                    let (chunks, vectors) = self.embed_document(document).await?;
                    self.check_abort(collection)?;
                    if store.fill_if_empty(collection, chunks, vectors).await? {
                        IngestOutcome::Ingested
                    } else {
                        // Filled by someone else while we were embedding.
                        let count = store
                            .collection_info(collection)
                            .await?
                            .map_or(0, |i| i.chunk_count);
                        self.log_skip(collection, count);
                        IngestOutcome::Skipped
                    }
                }
            }
        };

        let info = store.collection_info(collection).await?;
        let report = IngestReport {
            collection: collection.to_string(),
            source: document.source.clone(),
            policy: self.policy,
            outcome,
            chunk_count: info.as_ref().map_or(0, |i| i.chunk_count),
            dimension: info.and_then(|i| i.dimension),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        tracing::info!(
            "Collection '{}' ready with {} chunks in {}ms",
            report.collection,
            report.chunk_count,
            report.duration_ms
        );
        Ok(report)
    }

    fn log_skip(&self, collection: &str, chunk_count: u64) {
        tracing::info!(
            "Collection '{}' already holds {} chunks, skipping ingestion",
            collection,
            chunk_count
        );
    }

    /// Chunk and embed the whole document, keeping vectors in chunk order.
    async fn embed_document(
        &self,
        document: &Document,
    ) -> Result<(Vec<Chunk>, Vec<Vec<f32>>), IngestError> {
        let chunks = self.chunker.chunk(document);
        let total = chunks.len();
        let mut vectors = Vec::with_capacity(total);

        tracing::debug!(
            "Embedding {} chunks with {} in batches of {}",
            total,
            self.embedder.model_id(),
            self.batch_size
        );

        for batch in chunks.chunks(self.batch_size) {
            if self.abort.is_aborted() {
                return Err(IngestError::Aborted);
            }

            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embedded = self.embedder.embed_batch(&texts).await?;
            if embedded.len() != texts.len() {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "requested {} embeddings, received {}",
                    texts.len(),
                    embedded.len()
                ))
                .into());
            }
            vectors.extend(embedded);

            if let Some(progress) = &self.progress {
                progress(vectors.len(), total);
            }
        }

        Ok((chunks, vectors))
    }

    fn check_abort(&self, collection: &str) -> Result<(), IngestError> {
        if self.abort.is_aborted() {
            tracing::warn!("Ingestion into '{}' aborted before commit", collection);
            return Err(IngestError::Aborted);
        }
        Ok(())
    }
}
