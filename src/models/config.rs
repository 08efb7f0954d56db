use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::search::IngestPolicy;
use crate::error::ConfigError;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 384;
pub const DEFAULT_CHAT_MODEL: &str = "llama3";
pub const DEFAULT_COLLECTION: &str = "default";
pub const DEFAULT_STORE_FILE: &str = "vectors.db";

const CONFIG_PATH_ENV: &str = "DOCRAG_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub ingestion: IngestionConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
            && !path.trim().is_empty()
        {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|p| p.join("docrag").join("config.toml"))
    }

    /// Load the config file (defaults when absent), apply environment
    /// overrides and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Apply `DOCRAG_*` overrides looked up through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("DOCRAG_OLLAMA_URL") {
            self.embedding.url = url.clone();
            self.generation.url = url;
        }
        if let Some(model) = var("DOCRAG_EMBED_MODEL") {
            // The configured dimension belongs to the configured model.
            if model != self.embedding.model {
                self.embedding.dimension = None;
            }
            self.embedding.model = model;
        }
        if let Some(dimension) = var("DOCRAG_EMBED_DIMENSION").and_then(|d| d.trim().parse().ok()) {
            self.embedding.dimension = Some(dimension);
        }
        if let Some(model) = var("DOCRAG_CHAT_MODEL") {
            self.generation.model = model;
        }
        if let Some(path) = var("DOCRAG_STORE_PATH") {
            self.store.path = PathBuf::from(path);
        }
        if let Some(collection) = var("DOCRAG_COLLECTION") {
            self.store.collection = collection;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunking.validate()?;

        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.batch_size must be at least 1".to_string(),
            ));
        }
        if self.embedding.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.concurrency must be at least 1".to_string(),
            ));
        }
        if self.store.collection.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "store.collection cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Expected vector length; responses of any other length are rejected.
    /// `0` turns the check off.
    #[serde(default = "default_embedding_dimension")]
    pub dimension: Option<u32>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Embedding requests in flight at once within one batch.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_ollama_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_embedding_dimension() -> Option<u32> {
    Some(DEFAULT_EMBEDDING_DIMENSION)
}

fn default_timeout() -> u64 {
    120
}

fn default_batch_size() -> u32 {
    8
}

fn default_concurrency() -> u32 {
    4
}

fn default_max_retries() -> u32 {
    3
}

impl EmbeddingConfig {
    /// The vector length to enforce, if any.
    pub fn expected_dimension(&self) -> Option<usize> {
        self.dimension.filter(|d| *d > 0).map(|d| d as usize)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_timeout(),
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,

    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_stop")]
    pub stop: Vec<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_chat_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_stop() -> Vec<String> {
    vec!["\n".to_string()]
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_chat_model(),
            temperature: default_temperature(),
            stop: default_stop(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("docrag"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_STORE_FILE)
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            collection: default_collection(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Characters shared between neighbouring chunks; must be below `chunk_size`.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,

    /// Split points, coarsest first. An empty string means per-character.
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

fn default_chunk_size() -> u32 {
    100
}

fn default_chunk_overlap() -> u32 {
    10
}

fn default_separators() -> Vec<String> {
    ["\n\n", "\n", " ", ""].iter().map(|s| s.to_string()).collect()
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            separators: default_separators(),
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunking.chunk_size must be at least 1".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.separators.is_empty() {
            return Err(ConfigError::ValidationError(
                "chunking.separators cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Upper bound on context characters placed in the prompt.
    #[serde(default)]
    pub max_context_chars: Option<usize>,
}

fn default_top_k() -> u32 {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_chars: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    #[serde(default)]
    pub policy: IngestPolicy,

    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: u64,
}

fn default_max_document_bytes() -> u64 {
    50 * 1024 * 1024
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            policy: IngestPolicy::default(),
            max_document_bytes: default_max_document_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.embedding.url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.embedding.model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.generation.model, DEFAULT_CHAT_MODEL);
        assert_eq!(config.store.collection, DEFAULT_COLLECTION);
        assert!(config.store.path.ends_with(DEFAULT_STORE_FILE));
        assert_eq!(config.ingestion.policy, IngestPolicy::Overwrite);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chunking_defaults() {
        let config = ChunkingConfig::default();
        assert_eq!(config.chunk_size, 100);
        assert_eq!(config.chunk_overlap, 10);
        assert_eq!(config.separators, vec!["\n\n", "\n", " ", ""]);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let config = ChunkingConfig {
            chunk_size: 10,
            chunk_overlap: 10,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let mut config = Config::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    #[test]
    fn test_model_override_clears_dimension() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[("DOCRAG_EMBED_MODEL", "nomic-embed-text")]));
        assert_eq!(config.embedding.model, "nomic-embed-text");
        assert_eq!(config.embedding.expected_dimension(), None);

        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("DOCRAG_EMBED_MODEL", "nomic-embed-text"),
            ("DOCRAG_EMBED_DIMENSION", "768"),
        ]));
        assert_eq!(config.embedding.expected_dimension(), Some(768));

        let mut config = Config::default();
        config.apply_overrides(lookup(&[("DOCRAG_EMBED_MODEL", DEFAULT_EMBEDDING_MODEL)]));
        assert_eq!(
            config.embedding.expected_dimension(),
            Some(DEFAULT_EMBEDDING_DIMENSION as usize)
        );
    }

    #[test]
    fn test_blank_overrides_ignored() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[("DOCRAG_COLLECTION", "  ")]));
        assert_eq!(config.store.collection, DEFAULT_COLLECTION);
    }

    #[test]
    fn test_zero_dimension_disables_check() {
        let config: Config = toml::from_str(
            r#"
            [embedding]
            model = "nomic-embed-text"
            dimension = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.embedding.expected_dimension(), None);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [chunking]
            chunk_size = 500

            [ingestion]
            policy = "reuse"
            "#,
        )
        .unwrap();
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 10);
        assert_eq!(config.ingestion.policy, IngestPolicy::ReuseIfPresent);
        assert_eq!(config.retrieval.top_k, 3);
    }

    #[test]
    fn test_toml_round_trip_keeps_separators() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.chunking.separators, config.chunking.separators);
        assert_eq!(parsed.generation.stop, vec!["\n"]);
    }
}
