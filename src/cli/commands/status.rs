use anyhow::Result;

use super::{load_config, open_configured_store};
use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::OutputFormat;
use crate::services::OllamaEmbedder;

pub async fn handle_status(format: OutputFormat, verbose: bool) -> Result<()> {
    let config = load_config()?;
    let formatter = get_formatter(format);

    let ollama_reachable = match OllamaEmbedder::new(&config.embedding) {
        Ok(embedder) => embedder.health_check().await.unwrap_or(false),
        Err(_) => false,
    };

    let (store_ok, collections) = match open_configured_store(&config) {
        Ok(store) => {
            let ok = store.store().health_check().await.unwrap_or(false);
            let collections = store.store().list_collections().await.unwrap_or_default();
            (ok, collections)
        }
        Err(e) => {
            if verbose {
                eprintln!("{e:#}");
            }
            (false, Vec::new())
        }
    };

    let status = StatusInfo {
        ollama_url: config.embedding.url.clone(),
        ollama_reachable,
        embedding_model: config.embedding.model.clone(),
        chat_model: config.generation.model.clone(),
        store_path: config.store.path.display().to_string(),
        store_ok,
        default_collection: config.store.collection.clone(),
        collections,
    };

    print!("{}", formatter.format_status(&status));

    if !ollama_reachable {
        eprintln!();
        eprintln!(
            "Warning: Ollama not reachable at {}. Start it with: ollama serve",
            config.embedding.url
        );
        eprintln!(
            "         and pull the models: ollama pull {} && ollama pull {}",
            config.embedding.model, config.generation.model
        );
    }

    Ok(())
}
