//! Error types for docrag.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to configuration, including invalid chunker settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors raised while resolving a source into a document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source not found: {0}")]
    NotFound(String),

    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to fetch source: {0}")]
    Http(String),

    #[error("source exceeds maximum size: {size} > {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("unsupported source format: {0}")]
    Unsupported(String),

    #[error("failed to parse source: {0}")]
    Parse(String),
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding server: {0}")]
    ConnectionError(String),

    #[error("embedding server error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            EmbeddingError::ServerError(msg) => is_transient_status(msg),
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            EmbeddingError::InvalidResponse(_) => false,
        }
    }
}

/// Errors related to the generative model backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to connect to generation server: {0}")]
    ConnectionError(String),

    #[error("generation server error: {0}")]
    ServerError(String),

    #[error("generation request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid generation response: {0}")]
    InvalidResponse(String),

    #[error("generation timeout")]
    Timeout,
}

impl Retryable for GenerationError {
    fn is_retryable(&self) -> bool {
        match self {
            GenerationError::ConnectionError(_) | GenerationError::Timeout => true,
            GenerationError::ServerError(msg) => is_transient_status(msg),
            GenerationError::RequestError(e) => e.is_timeout() || e.is_connect(),
            GenerationError::InvalidResponse(_) => false,
        }
    }
}

fn is_transient_status(msg: &str) -> bool {
    let lower = msg.to_lowercase();
    msg.contains("503")
        || msg.contains("502")
        || msg.contains("504")
        || msg.contains("429")
        || lower.contains("unavailable")
        || lower.contains("too many requests")
}

/// Errors related to the persisted vector store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to prepare store location: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "dimension mismatch in collection '{collection}': expected {expected}, got {actual}"
    )]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    #[error("{chunks} chunks paired with {vectors} vectors")]
    LengthMismatch { chunks: usize, vectors: usize },

    #[error("corrupt record in collection '{collection}': {reason}")]
    CorruptRecord { collection: String, reason: String },

    #[error("store task failed: {0}")]
    Task(String),
}

impl StoreError {
    /// Dimension conflicts come from pairing the wrong embedder with a
    /// collection and are never fixed by retrying.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, StoreError::DimensionMismatch { .. })
    }
}

/// Errors related to ingestion runs.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("load error: {0}")]
    Load(#[from] LoadError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ingestion aborted")]
    Aborted,
}

/// Errors related to retrieval.
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors related to answering a question end to end.
#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("retrieval error: {0}")]
    Retrieve(#[from] RetrieveError),

    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("retrieve error: {0}")]
    Retrieve(#[from] RetrieveError),

    #[error("answer error: {0}")]
    Answer(#[from] AnswerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_error_retryable() {
        assert!(EmbeddingError::Timeout.is_retryable());
        assert!(EmbeddingError::ConnectionError("refused".into()).is_retryable());
        assert!(EmbeddingError::ServerError("status 503: busy".into()).is_retryable());
        assert!(!EmbeddingError::ServerError("status 400: bad".into()).is_retryable());
        assert!(!EmbeddingError::InvalidResponse("empty".into()).is_retryable());
    }

    #[test]
    fn test_generation_error_retryable() {
        assert!(GenerationError::ServerError("Service Unavailable".into()).is_retryable());
        assert!(!GenerationError::InvalidResponse("missing field".into()).is_retryable());
    }

    #[test]
    fn test_dimension_mismatch_is_configuration_error() {
        let err = StoreError::DimensionMismatch {
            collection: "docs".into(),
            expected: 384,
            actual: 1536,
        };
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("expected 384, got 1536"));
        assert!(!StoreError::Task("join".into()).is_configuration_error());
    }
}
