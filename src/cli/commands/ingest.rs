use anyhow::{Context, Result};
use clap::Args;

use super::{build_embedder, load_config, open_configured_store, resolve_collection, run_ingestion};
use crate::cli::output::get_formatter;
use crate::models::{IngestPolicy, OutputFormat, SourceLocator};
use crate::services::TextChunker;
use crate::sources::{DocumentLoader, SourceLoader};

#[derive(Debug, Args)]
pub struct IngestArgs {
    #[arg(required = true, help = "File path or http(s) URL of the document")]
    pub source: SourceLocator,

    #[arg(long, short = 'c', help = "Target collection")]
    pub collection: Option<String>,

    #[arg(long, help = "Ingestion policy: overwrite or reuse")]
    pub policy: Option<IngestPolicy>,

    #[arg(long, help = "Maximum chunk length in characters")]
    pub chunk_size: Option<u32>,

    #[arg(long, help = "Characters shared between neighbouring chunks")]
    pub chunk_overlap: Option<u32>,

    #[arg(long, help = "Only show the chunks, without embedding or storing")]
    pub dry_run: bool,
}

pub async fn handle_ingest(args: IngestArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let mut config = load_config()?;
    let formatter = get_formatter(format);

    if let Some(size) = args.chunk_size {
        config.chunking.chunk_size = size;
    }
    if let Some(overlap) = args.chunk_overlap {
        config.chunking.chunk_overlap = overlap;
    }
    config.validate()?;

    let collection = resolve_collection(args.collection, &config);
    let policy = args.policy.unwrap_or(config.ingestion.policy);

    if verbose {
        eprintln!("Source: {}", args.source);
        eprintln!("  Collection: {collection}");
        eprintln!("  Policy: {policy}");
        eprintln!(
            "  Chunking: size {} overlap {}",
            config.chunking.chunk_size, config.chunking.chunk_overlap
        );
    }

    if args.dry_run {
        let loader = SourceLoader::new(&config.ingestion)?;
        let document = loader
            .load(&args.source)
            .await
            .with_context(|| format!("failed to load {}", args.source))?;
        let chunks = TextChunker::new(&config.chunking)?.chunk(&document);
        print!("{}", formatter.format_chunk_preview(&document.source, &chunks));
        return Ok(());
    }

    let store = open_configured_store(&config)?;
    let embedder = build_embedder(&config)?;
    let report = run_ingestion(
        &config,
        store,
        embedder,
        &args.source,
        &collection,
        policy,
        format,
    )
    .await?;

    print!("{}", formatter.format_ingest_report(&report));
    Ok(())
}
