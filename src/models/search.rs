//! Query-side models and the ingestion policy switch.

use serde::{Deserialize, Serialize};

use super::document::Chunk;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
    /// Documentation-friendly Markdown format
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// How ingestion treats a collection that may already hold data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestPolicy {
    /// Drop whatever the collection holds and ingest fresh.
    #[default]
    #[serde(rename = "overwrite")]
    Overwrite,
    /// Keep a populated collection untouched; ingest only into an empty one.
    #[serde(rename = "reuse", alias = "reuse_if_present")]
    ReuseIfPresent,
}

impl std::str::FromStr for IngestPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overwrite" => Ok(IngestPolicy::Overwrite),
            "reuse" | "reuse-if-present" | "reuse_if_present" => Ok(IngestPolicy::ReuseIfPresent),
            _ => Err(format!("unknown ingestion policy: {}", s)),
        }
    }
}

impl std::fmt::Display for IngestPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestPolicy::Overwrite => write!(f, "overwrite"),
            IngestPolicy::ReuseIfPresent => write!(f, "reuse"),
        }
    }
}

/// A question and the number of chunks wanted for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub k: usize,
}

impl Query {
    pub fn new(text: impl Into<String>, k: usize) -> Self {
        Self {
            text: text.into(),
            k,
        }
    }
}

/// A stored chunk together with its cosine similarity to a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Ranked retrieval output for one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResults {
    pub query: String,
    pub collection: String,
    pub results: Vec<ScoredChunk>,
    pub duration_ms: u64,
    /// Rendered prompt, when the caller asked to see it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl RetrievalResults {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "md".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_ingest_policy_parse() {
        assert_eq!(
            "overwrite".parse::<IngestPolicy>().unwrap(),
            IngestPolicy::Overwrite
        );
        assert_eq!(
            "Reuse".parse::<IngestPolicy>().unwrap(),
            IngestPolicy::ReuseIfPresent
        );
        assert!("append".parse::<IngestPolicy>().is_err());
        assert_eq!(IngestPolicy::ReuseIfPresent.to_string(), "reuse");
    }
}
