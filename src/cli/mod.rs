//! Command-line interface for docrag.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Ask questions about your documents with a local Ollama model.
#[derive(Debug, Parser)]
#[command(name = "docrag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load a document, chunk and embed it into a collection
    Ingest(commands::IngestArgs),

    /// Show the chunks most similar to a question
    Query(commands::QueryArgs),

    /// Answer a question (or start an interactive session) from a collection
    Ask(commands::AskArgs),

    /// List or delete collections
    #[command(subcommand)]
    Collections(commands::CollectionsCommand),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),

    /// Check Ollama and vector store status
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IngestPolicy, SourceLocator};
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ingest() {
        let cli = Cli::parse_from([
            "docrag",
            "-f",
            "json",
            "ingest",
            "https://example.com/book.pdf",
            "-c",
            "books",
            "--policy",
            "reuse",
            "--chunk-size",
            "200",
        ]);
        assert_eq!(cli.format, Some(OutputFormat::Json));
        let Commands::Ingest(args) = cli.command else {
            panic!("expected ingest");
        };
        assert_eq!(args.source, SourceLocator::Url("https://example.com/book.pdf".to_string()));
        assert_eq!(args.collection.as_deref(), Some("books"));
        assert_eq!(args.policy, Some(IngestPolicy::ReuseIfPresent));
        assert_eq!(args.chunk_size, Some(200));
        assert!(!args.dry_run);
    }

    #[test]
    fn test_parse_ask_without_question() {
        let cli = Cli::parse_from(["docrag", "ask", "-k", "1", "--show-sources", "-v"]);
        assert!(cli.verbose);
        let Commands::Ask(args) = cli.command else {
            panic!("expected ask");
        };
        assert!(args.question.is_none());
        assert_eq!(args.top_k, Some(1));
        assert!(args.show_sources);
    }

    #[test]
    fn test_config_init_force_beside_format() {
        let cli = Cli::parse_from(["docrag", "config", "init", "--force", "-f", "json"]);
        assert_eq!(cli.format, Some(OutputFormat::Json));
        let Commands::Config(commands::ConfigCommand::Init { force }) = cli.command else {
            panic!("expected config init");
        };
        assert!(force);
    }

    #[test]
    fn test_rejects_unknown_policy() {
        let result = Cli::try_parse_from(["docrag", "ingest", "a.txt", "--policy", "append"]);
        assert!(result.is_err());
    }
}
