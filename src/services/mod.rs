mod answer;
mod chunker;
mod embedding;
mod generation;
mod pipeline;
mod prompt;
mod retriever;
pub mod vector_store;

pub use answer::{Answer, AnswerService};
pub use chunker::{Chunks, TextChunker};
pub use embedding::{Embedder, OllamaEmbedder};
pub use generation::{Generator, OllamaGenerator};
pub use pipeline::{AbortHandle, IngestOutcome, IngestReport, IngestionPipeline, ProgressFn};
pub use prompt::{ContextAssembler, DEFAULT_DELIMITER, DEFAULT_PREAMBLE};
pub use retriever::Retriever;
pub use vector_store::{
    CollectionInfo, CollectionLocks, SqliteVectorStore, StoreHandle, VectorStore, open_store,
};
