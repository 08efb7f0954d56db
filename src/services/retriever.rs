use std::sync::Arc;
use std::time::Instant;

use super::embedding::Embedder;
use super::vector_store::StoreHandle;
use crate::error::RetrieveError;
use crate::models::{Query, RetrievalResults};

/// Embeds a question and ranks a collection's chunks against it.
///
/// Read-only: any number of retrievals may run at once, but each waits while
/// its collection is being ingested.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: StoreHandle,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: StoreHandle) -> Self {
        Self { embedder, store }
    }

    pub async fn retrieve(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<RetrievalResults, RetrieveError> {
        let text = query.text.trim();
        if text.is_empty() {
            return Err(RetrieveError::InvalidQuery(
                "question cannot be empty".to_string(),
            ));
        }

        let start = Instant::now();
        let mut results = RetrievalResults {
            query: query.text.clone(),
            collection: collection.to_string(),
            results: Vec::new(),
            duration_ms: 0,
            prompt: None,
        };

        if query.k > 0 {
            let vector = self.embedder.embed(&query.text).await?;
            let _guard = self.store.locks().read(collection).await;
            results.results = self
                .store
                .store()
                .query_similar(collection, &vector, query.k)
                .await?;
        }

        results.duration_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            "Retrieved {} chunks from '{}' in {}ms",
            results.len(),
            collection,
            results.duration_ms
        );
        Ok(results)
    }
}
