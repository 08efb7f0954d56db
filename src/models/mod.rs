mod config;
mod document;
mod search;
mod source;

pub use config::{
    ChunkingConfig, Config, DEFAULT_CHAT_MODEL, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_DIMENSION,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_STORE_FILE, EmbeddingConfig,
    GenerationConfig, IngestionConfig, RetrievalConfig, StoreConfig,
};
pub use document::{Chunk, Document};
pub use search::{IngestPolicy, OutputFormat, Query, RetrievalResults, ScoredChunk};
pub use source::SourceLocator;
