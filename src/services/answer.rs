use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::generation::Generator;
use super::prompt::ContextAssembler;
use super::retriever::Retriever;
use crate::error::AnswerError;
use crate::models::{Query, ScoredChunk};

/// A generated answer with the prompt and chunks it was built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub prompt: String,
    pub sources: Vec<ScoredChunk>,
}

/// Retrieve, assemble, generate.
pub struct AnswerService {
    retriever: Retriever,
    assembler: ContextAssembler,
    generator: Arc<dyn Generator>,
}

impl AnswerService {
    pub fn new(retriever: Retriever, assembler: ContextAssembler, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            assembler,
            generator,
        }
    }

    pub async fn answer(&self, collection: &str, query: &Query) -> Result<Answer, AnswerError> {
        let retrieved = self.retriever.retrieve(collection, query).await?;
        let prompt = self.assembler.assemble(&query.text, &retrieved.results);

        tracing::debug!(
            "Generating with {} from {} chunks",
            self.generator.model_id(),
            retrieved.len()
        );
        let answer = self.generator.generate(&prompt).await?;

        Ok(Answer {
            question: query.text.clone(),
            answer,
            prompt,
            sources: retrieved.results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EmbeddingError, GenerationError, RetrieveError};
    use crate::models::{ChunkingConfig, Document};
    use crate::services::embedding::Embedder;
    use crate::services::pipeline::IngestionPipeline;
    use crate::services::vector_store::{SqliteVectorStore, StoreHandle};
    use crate::services::TextChunker;
    use async_trait::async_trait;

    struct ColorEmbedder;

    #[async_trait]
    impl Embedder for ColorEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let lower = text.to_lowercase();
            Ok(vec![
                if lower.contains("sky") { 1.0 } else { 0.0 },
                if lower.contains("grass") { 1.0 } else { 0.0 },
            ])
        }

        fn model_id(&self) -> &str {
            "color"
        }
    }

    /// Reports the prompt length.
    struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            Ok(format!("echo: {} chars", prompt.len()))
        }

        fn model_id(&self) -> &str {
            "echo"
        }
    }

    struct BrokenGenerator;

    #[async_trait]
    impl Generator for BrokenGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Err(GenerationError::Timeout)
        }

        fn model_id(&self) -> &str {
            "broken"
        }
    }

    async fn retriever() -> Retriever {
        let store = StoreHandle::new(Arc::new(SqliteVectorStore::open_in_memory().unwrap()));
        let embedder: Arc<dyn Embedder> = Arc::new(ColorEmbedder);
        let chunker = TextChunker::new(&ChunkingConfig {
            chunk_size: 20,
            chunk_overlap: 5,
            ..Default::default()
        })
        .unwrap();
        IngestionPipeline::new(store.clone(), Arc::clone(&embedder), chunker)
            .ingest_document(
                &Document::new("sky.txt", "The sky is blue. The grass is green.".to_string()),
                "docs",
            )
            .await
            .unwrap();
        Retriever::new(embedder, store)
    }

    #[tokio::test]
    async fn test_answer_carries_prompt_and_sources() {
        let service = AnswerService::new(retriever().await, ContextAssembler::new(), Arc::new(EchoGenerator));
        let answer = service
            .answer("docs", &Query::new("What color is the sky?", 1))
            .await
            .unwrap();

        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].chunk.content, "The sky is blue. ");
        assert!(answer.prompt.contains("The sky is blue. "));
        assert!(answer.prompt.contains("What color is the sky?"));
        assert_eq!(answer.answer, format!("echo: {} chars", answer.prompt.len()));
    }

    #[tokio::test]
    async fn test_generation_failure_surfaces() {
        let service = AnswerService::new(retriever().await, ContextAssembler::new(), Arc::new(BrokenGenerator));
        let err = service
            .answer("docs", &Query::new("sky?", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AnswerError::Generation(GenerationError::Timeout)));
    }

    #[tokio::test]
    async fn test_blank_question_rejected_before_generation() {
        let service = AnswerService::new(retriever().await, ContextAssembler::new(), Arc::new(BrokenGenerator));
        let err = service.answer("docs", &Query::new("", 1)).await.unwrap_err();
        assert!(matches!(err, AnswerError::Retrieve(RetrieveError::InvalidQuery(_))));
    }
}
