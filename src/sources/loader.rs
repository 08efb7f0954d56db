use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;

use super::DocumentLoader;
use crate::error::LoadError;
use crate::models::{Document, IngestionConfig, SourceLocator};
use crate::utils::{has_pdf_magic, is_binary_extension, looks_binary};

const DOWNLOAD_TIMEOUT_SECS: u64 = 120;

/// Loads plain text and PDF documents from local files or HTTP(S) URLs.
#[derive(Debug, Clone)]
pub struct SourceLoader {
    client: Client,
    max_bytes: u64,
}

impl SourceLoader {
    pub fn new(config: &IngestionConfig) -> Result<Self, LoadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .map_err(|e| LoadError::Http(e.to_string()))?;

        Ok(Self {
            client,
            max_bytes: config.max_document_bytes,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, LoadError> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LoadError::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_file() {
            return Err(LoadError::Unsupported(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        self.check_size(metadata.len())?;

        Ok(tokio::fs::read(path).await?)
    }

    async fn download(&self, url: &str) -> Result<(Vec<u8>, Option<String>), LoadError> {
        tracing::debug!("Downloading {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LoadError::Http(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LoadError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(LoadError::Http(format!("status {} for {}", status, url)));
        }

        if let Some(length) = response.content_length() {
            self.check_size(length)?;
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_lowercase());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LoadError::Http(e.to_string()))?;
        self.check_size(bytes.len() as u64)?;

        Ok((bytes.to_vec(), content_type))
    }

    fn check_size(&self, size: u64) -> Result<(), LoadError> {
        if size > self.max_bytes {
            return Err(LoadError::TooLarge {
                size,
                max: self.max_bytes,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentLoader for SourceLoader {
    async fn load(&self, source: &SourceLocator) -> Result<Document, LoadError> {
        let (bytes, content_type) = match source {
            SourceLocator::Path(path) => (self.read_file(path).await?, None),
            SourceLocator::Url(url) => self.download(url).await?,
        };

        let extension = source.extension();
        let text = extract_text(bytes, extension.as_deref(), content_type.as_deref()).await?;

        tracing::debug!("Loaded {} ({} chars)", source, text.chars().count());
        Ok(Document::new(source.to_string(), text))
    }
}

async fn extract_text(
    bytes: Vec<u8>,
    extension: Option<&str>,
    content_type: Option<&str>,
) -> Result<String, LoadError> {
    let is_pdf = extension == Some("pdf")
        || content_type.is_some_and(|ct| ct.contains("application/pdf"))
        || has_pdf_magic(&bytes);

    if is_pdf {
        // pdf-extract is CPU bound and may panic on malformed input.
        return tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| LoadError::Parse(format!("PDF extraction crashed: {}", e)))?
            .map_err(|e| LoadError::Parse(format!("PDF extraction failed: {}", e)));
    }

    if let Some(ext) = extension
        && is_binary_extension(ext)
    {
        return Err(LoadError::Unsupported(format!(".{} files", ext)));
    }
    if looks_binary(&bytes) {
        return Err(LoadError::Unsupported("binary content".to_string()));
    }

    String::from_utf8(bytes).map_err(|e| LoadError::Parse(format!("not valid UTF-8: {}", e)))
}
