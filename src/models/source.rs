use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where a document comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum SourceLocator {
    Path(PathBuf),
    Url(String),
}

impl SourceLocator {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let lower = trimmed.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            SourceLocator::Url(trimmed.to_string())
        } else {
            SourceLocator::Path(PathBuf::from(trimmed))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SourceLocator::Url(_))
    }

    /// Lowercased file extension of the path or URL, if any.
    pub fn extension(&self) -> Option<String> {
        let name = match self {
            SourceLocator::Path(path) => path.file_name()?.to_string_lossy().to_string(),
            SourceLocator::Url(url) => {
                let without_query = url.split(['?', '#']).next().unwrap_or(url);
                without_query.rsplit('/').next()?.to_string()
            }
        };
        let (_, ext) = name.rsplit_once('.')?;
        if ext.is_empty() {
            None
        } else {
            Some(ext.to_lowercase())
        }
    }
}

impl std::fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceLocator::Path(path) => write!(f, "{}", path.display()),
            SourceLocator::Url(url) => write!(f, "{}", url),
        }
    }
}

impl std::str::FromStr for SourceLocator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err("source cannot be empty".to_string());
        }
        Ok(Self::parse(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_and_path() {
        assert!(SourceLocator::parse("https://example.com/book.pdf").is_remote());
        assert!(SourceLocator::parse("HTTP://example.com").is_remote());
        assert_eq!(
            SourceLocator::parse("./notes/today.md"),
            SourceLocator::Path(PathBuf::from("./notes/today.md"))
        );
    }

    #[test]
    fn test_extension() {
        assert_eq!(
            SourceLocator::parse("https://x.org/a/Book.PDF?dl=1").extension(),
            Some("pdf".to_string())
        );
        assert_eq!(
            SourceLocator::parse("/tmp/readme.txt").extension(),
            Some("txt".to_string())
        );
        assert_eq!(SourceLocator::parse("https://x.org/").extension(), None);
        assert_eq!(SourceLocator::parse("/tmp/Makefile").extension(), None);
    }

    #[test]
    fn test_empty_source_rejected() {
        assert!("  ".parse::<SourceLocator>().is_err());
    }
}
