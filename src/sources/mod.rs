//! Document sources.
//!
//! A loader turns a [`SourceLocator`] into a [`Document`]. The ingestion
//! pipeline only depends on the [`DocumentLoader`] trait.

mod loader;

pub use loader::SourceLoader;

use async_trait::async_trait;

use crate::error::LoadError;
use crate::models::{Document, SourceLocator};

/// Resolves a source into document text.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, source: &SourceLocator) -> Result<Document, LoadError>;
}
