use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Show the effective configuration")]
    Show,
    #[command(about = "Write a configuration file with default values")]
    Init {
        #[arg(long, help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show the configuration file path")]
    Path,
}

pub async fn handle_config(cmd: ConfigCommand, format: OutputFormat, _verbose: bool) -> Result<()> {
    match cmd {
        ConfigCommand::Show => handle_show(format),
        ConfigCommand::Init { force } => handle_init(force, format),
        ConfigCommand::Path => handle_path(format),
    }
}

fn handle_show(format: OutputFormat) -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Markdown => {
            println!("```toml\n{}```", toml::to_string_pretty(&config)?);
        }
        OutputFormat::Text => {
            if let Some(path) = Config::config_path() {
                let state = if path.exists() { "" } else { " (not created, using defaults)" };
                println!("# Config: {}{}", path.display(), state);
                println!();
            }
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

fn handle_init(force: bool, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let path = Config::config_path()
        .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let path = Config::default()
        .save()
        .context("failed to write config file")?;
    print!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", path.display()))
    );
    Ok(())
}

fn handle_path(format: OutputFormat) -> Result<()> {
    let path = Config::config_path()
        .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

    if format == OutputFormat::Json {
        let json = serde_json::json!({
            "path": path,
            "exists": path.exists(),
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("{}", path.display());
    }
    Ok(())
}
