mod ask;
mod collections;
mod config;
mod ingest;
mod query;
mod status;

pub use ask::AskArgs;
pub use collections::CollectionsCommand;
pub use config::ConfigCommand;
pub use ingest::IngestArgs;
pub use query::QueryArgs;

pub use ask::handle_ask;
pub use collections::handle_collections;
pub use config::handle_config;
pub use ingest::handle_ingest;
pub use query::handle_query;
pub use status::handle_status;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

use crate::models::{Config, IngestPolicy, OutputFormat, SourceLocator};
use crate::services::{
    Embedder, IngestReport, IngestionPipeline, OllamaEmbedder, StoreHandle, TextChunker,
    open_store,
};
use crate::sources::SourceLoader;

fn load_config() -> Result<Config> {
    Config::load().context("failed to load configuration")
}

fn open_configured_store(config: &Config) -> Result<StoreHandle> {
    open_store(&config.store.path).with_context(|| {
        format!(
            "failed to open vector store at {}",
            config.store.path.display()
        )
    })
}

fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let embedder =
        OllamaEmbedder::new(&config.embedding).context("failed to create embedding client")?;
    Ok(Arc::new(embedder))
}

fn resolve_collection(arg: Option<String>, config: &Config) -> String {
    arg.filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| config.store.collection.clone())
}

/// Load `source` and ingest it, drawing a progress bar for text output.
async fn run_ingestion(
    config: &Config,
    store: StoreHandle,
    embedder: Arc<dyn Embedder>,
    source: &SourceLocator,
    collection: &str,
    policy: IngestPolicy,
    format: OutputFormat,
) -> Result<IngestReport> {
    let loader = SourceLoader::new(&config.ingestion).context("failed to create loader")?;
    let chunker = TextChunker::new(&config.chunking).context("invalid chunking settings")?;

    let pb = if format == OutputFormat::Text {
        ProgressBar::new(0)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})")
            .context("invalid progress bar template")?
            .progress_chars("#>-"),
    );

    let bar = pb.clone();
    let pipeline = IngestionPipeline::new(store, embedder, chunker)
        .with_policy(policy)
        .with_batch_size(config.embedding.batch_size as usize)
        .with_progress(Arc::new(move |done: usize, total: usize| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
        }));

    let result = pipeline.ingest(&loader, source, collection).await;
    pb.finish_and_clear();

    result.with_context(|| format!("failed to ingest {} into '{}'", source, collection))
}
