use anyhow::{Context, Result};
use clap::Subcommand;
use console::Term;

use super::{load_config, open_configured_store};
use crate::cli::output::get_formatter;
use crate::models::OutputFormat;

#[derive(Debug, Subcommand)]
pub enum CollectionsCommand {
    #[command(about = "List collections in the vector store")]
    List,
    #[command(about = "Delete a collection and all of its chunks")]
    Delete {
        #[arg(required = true, help = "Collection name")]
        name: String,
        #[arg(long, short = 'y', help = "Skip confirmation")]
        yes: bool,
    },
}

pub async fn handle_collections(
    cmd: CollectionsCommand,
    format: OutputFormat,
    _verbose: bool,
) -> Result<()> {
    let config = load_config()?;
    let formatter = get_formatter(format);
    let store = open_configured_store(&config)?;

    match cmd {
        CollectionsCommand::List => {
            let collections = store
                .store()
                .list_collections()
                .await
                .context("failed to list collections")?;
            print!("{}", formatter.format_collections(&collections));
        }
        CollectionsCommand::Delete { name, yes } => {
            let Some(info) = store.store().collection_info(&name).await? else {
                print!(
                    "{}",
                    formatter.format_message(&format!("Collection '{}' does not exist", name))
                );
                return Ok(());
            };

            if !yes && !confirm(&format!(
                "Delete collection '{}' with {} chunks? [y/N] ",
                name, info.chunk_count
            ))? {
                print!("{}", formatter.format_message("Cancelled"));
                return Ok(());
            }

            let _guard = store.locks().write(&name).await;
            store
                .store()
                .delete_collection(&name)
                .await
                .with_context(|| format!("failed to delete collection '{}'", name))?;
            print!(
                "{}",
                formatter.format_message(&format!("Deleted collection '{}'", name))
            );
        }
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    let term = Term::stderr();
    term.write_str(prompt)?;
    let answer = term.read_line()?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
