use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{build_embedder, load_config, open_configured_store, resolve_collection, run_ingestion};
use crate::cli::output::{Formatter, get_formatter};
use crate::models::{IngestPolicy, OutputFormat, Query, SourceLocator};
use crate::services::{AnswerService, ContextAssembler, OllamaGenerator, Retriever};

const EXIT_COMMAND: &str = "exit";

#[derive(Debug, Args)]
pub struct AskArgs {
    #[arg(help = "Question to answer; omit to start an interactive session")]
    pub question: Option<String>,

    #[arg(long, short = 'c', help = "Collection to answer from")]
    pub collection: Option<String>,

    #[arg(long, short = 'k', help = "Number of chunks placed in the prompt")]
    pub top_k: Option<usize>,

    #[arg(long, short = 's', help = "Ingest this file or URL before answering")]
    pub source: Option<SourceLocator>,

    #[arg(long, help = "Ingestion policy for --source: overwrite or reuse")]
    pub policy: Option<IngestPolicy>,

    #[arg(long, help = "Print the chunks each answer was built from")]
    pub show_sources: bool,
}

pub async fn handle_ask(args: AskArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = load_config()?;
    let formatter = get_formatter(format);
    let collection = resolve_collection(args.collection, &config);
    let k = args.top_k.unwrap_or(config.retrieval.top_k as usize);

    let store = open_configured_store(&config)?;
    let embedder = build_embedder(&config)?;

    if let Some(ref source) = args.source {
        let policy = args.policy.unwrap_or(config.ingestion.policy);
        let report = run_ingestion(
            &config,
            store.clone(),
            Arc::clone(&embedder),
            source,
            &collection,
            policy,
            format,
        )
        .await?;
        if verbose {
            eprint!("{}", formatter.format_ingest_report(&report));
        }
    }

    let generator =
        OllamaGenerator::new(&config.generation).context("failed to create generation client")?;
    let service = AnswerService::new(
        Retriever::new(embedder, store),
        ContextAssembler::new().with_max_context_chars(config.retrieval.max_context_chars),
        Arc::new(generator),
    );

    let session = Session {
        service: &service,
        formatter: formatter.as_ref(),
        collection: &collection,
        k,
        show_sources: args.show_sources,
    };

    match args.question {
        Some(question) => session.ask(&question).await,
        None => session.interactive().await,
    }
}

struct Session<'a> {
    service: &'a AnswerService,
    formatter: &'a dyn Formatter,
    collection: &'a str,
    k: usize,
    show_sources: bool,
}

impl Session<'_> {
    async fn ask(&self, question: &str) -> Result<()> {
        let answer = self
            .service
            .answer(self.collection, &Query::new(question, self.k))
            .await
            .context("failed to answer question")?;
        print!("{}", self.formatter.format_answer(&answer, self.show_sources));
        Ok(())
    }

    /// Answer questions from stdin until `exit` or end of input.
    async fn interactive(&self) -> Result<()> {
        eprintln!(
            "Asking collection '{}'. Type '{}' to quit.",
            self.collection, EXIT_COMMAND
        );

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            eprint!("{} ", style("Question:").bold().cyan());
            std::io::stderr().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if question.eq_ignore_ascii_case(EXIT_COMMAND) {
                break;
            }

            // A failed question does not end the session.
            if let Err(e) = self.ask(question).await {
                eprint!("{}", self.formatter.format_error(&format!("{e:#}")));
            }
            println!();
        }
        Ok(())
    }
}
