use async_trait::async_trait;
use std::sync::Arc;

use docrag::error::{EmbeddingError, GenerationError};
use docrag::models::{ChunkingConfig, Document, IngestPolicy, Query, SourceLocator};
use docrag::services::{
    AnswerService, ContextAssembler, DEFAULT_DELIMITER, Embedder, Generator, IngestOutcome,
    IngestionPipeline, Retriever, SqliteVectorStore, StoreHandle, TextChunker, open_store,
};
use docrag::sources::SourceLoader;

const DOCUMENT: &str = "The sky is blue. The grass is green.";
const QUESTION: &str = "What color is the sky?";

/// Puts "sky" and "grass" on separate axes, so the question lands on chunk 1.
struct TopicEmbedder;

#[async_trait]
impl Embedder for TopicEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let lower = text.to_lowercase();
        Ok(vec![
            if lower.contains("sky") { 1.0 } else { 0.1 },
            if lower.contains("grass") { 1.0 } else { 0.1 },
        ])
    }

    fn model_id(&self) -> &str {
        "topics"
    }
}

/// Answers with the first context line of the prompt.
struct FirstChunkGenerator;

#[async_trait]
impl Generator for FirstChunkGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut lines = prompt.lines().skip_while(|l| *l != DEFAULT_DELIMITER);
        lines.next();
        Ok(lines.next().unwrap_or_default().trim().to_string())
    }

    fn model_id(&self) -> &str {
        "first-chunk"
    }
}

fn chunker() -> TextChunker {
    TextChunker::new(&ChunkingConfig {
        chunk_size: 20,
        chunk_overlap: 5,
        ..Default::default()
    })
    .unwrap()
}

fn memory_store() -> StoreHandle {
    StoreHandle::new(Arc::new(SqliteVectorStore::open_in_memory().unwrap()))
}

#[tokio::test]
async fn test_sky_question_retrieves_first_chunk() {
    let store = memory_store();
    let embedder: Arc<dyn Embedder> = Arc::new(TopicEmbedder);

    let document = Document::new("sky.txt", DOCUMENT.to_string());
    let pipeline = IngestionPipeline::new(store.clone(), Arc::clone(&embedder), chunker());
    let chunks = pipeline.chunk_preview(&document);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].content, "The sky is blue. ");
    assert_eq!(chunks[1].content, "The grass is green.");

    let report = pipeline.ingest_document(&document, "default").await.unwrap();
    assert_eq!(report.chunk_count, 2);

    let retriever = Retriever::new(embedder, store);
    let results = retriever
        .retrieve("default", &Query::new(QUESTION, 1))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results.results[0].chunk.content, chunks[0].content);

    let prompt = ContextAssembler::new().assemble(QUESTION, &results.results);
    assert!(prompt.contains(&chunks[0].content));
    assert!(prompt.contains(DEFAULT_DELIMITER));
    assert!(prompt.contains(QUESTION));
    assert!(!prompt.contains(&chunks[1].content));
}

#[tokio::test]
async fn test_ask_from_file_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let doc_path = dir.path().join("sky.txt");
    std::fs::write(&doc_path, DOCUMENT).unwrap();
    let store_path = dir.path().join("vectors.db");

    let embedder: Arc<dyn Embedder> = Arc::new(TopicEmbedder);
    let loader = SourceLoader::new(&Default::default()).unwrap();
    let source = SourceLocator::Path(doc_path);

    {
        let store = open_store(&store_path).unwrap();
        let pipeline = IngestionPipeline::new(store, Arc::clone(&embedder), chunker())
            .with_policy(IngestPolicy::ReuseIfPresent);
        let first = pipeline.ingest(&loader, &source, "default").await.unwrap();
        let second = pipeline.ingest(&loader, &source, "default").await.unwrap();
        assert_eq!(first.outcome, IngestOutcome::Ingested);
        assert_eq!(second.outcome, IngestOutcome::Skipped);
        assert_eq!(first.chunk_count, second.chunk_count);
    }

    // A fresh process sees the persisted collection.
    let store = open_store(&store_path).unwrap();
    let service = AnswerService::new(
        Retriever::new(embedder, store),
        ContextAssembler::new(),
        Arc::new(FirstChunkGenerator),
    );
    let answer = service
        .answer("default", &Query::new(QUESTION, 1))
        .await
        .unwrap();
    assert_eq!(answer.answer, "The sky is blue.");
    assert_eq!(answer.sources.len(), 1);
}

#[tokio::test]
async fn test_unknown_collection_answers_from_empty_context() {
    let store = memory_store();
    let retriever = Retriever::new(Arc::new(TopicEmbedder), store);
    let results = retriever
        .retrieve("never-ingested", &Query::new(QUESTION, 3))
        .await
        .unwrap();
    assert!(results.is_empty());

    let prompt = ContextAssembler::new().assemble(QUESTION, &results.results);
    assert!(prompt.ends_with("Helpful Answer:"));
}
