use anyhow::{Context, Result};
use clap::Args;

use super::{build_embedder, load_config, open_configured_store, resolve_collection};
use crate::cli::output::get_formatter;
use crate::models::{OutputFormat, Query};
use crate::services::{ContextAssembler, Retriever};

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[arg(required = true, help = "Question to retrieve context for")]
    pub question: String,

    #[arg(long, short = 'c', help = "Collection to search")]
    pub collection: Option<String>,

    #[arg(long, short = 'k', help = "Number of chunks to return")]
    pub top_k: Option<usize>,

    #[arg(long, help = "Also print the assembled prompt")]
    pub prompt: bool,
}

pub async fn handle_query(args: QueryArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let question = args.question.trim();
    if question.is_empty() {
        anyhow::bail!("question cannot be empty");
    }

    let config = load_config()?;
    let formatter = get_formatter(format);
    let collection = resolve_collection(args.collection, &config);
    let k = args.top_k.unwrap_or(config.retrieval.top_k as usize);

    if verbose {
        eprintln!("Question: \"{question}\"");
        eprintln!("  Collection: {collection}");
        eprintln!("  K: {k}");
    }

    let store = open_configured_store(&config)?;
    let retriever = Retriever::new(build_embedder(&config)?, store);

    let mut results = retriever
        .retrieve(&collection, &Query::new(question, k))
        .await
        .context("retrieval failed")?;

    if args.prompt {
        let assembler =
            ContextAssembler::new().with_max_context_chars(config.retrieval.max_context_chars);
        results.prompt = Some(assembler.assemble(question, &results.results));
    }

    print!("{}", formatter.format_retrieval(&results));
    Ok(())
}
