use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use simgraph_core::config::AppConfig;
use simgraph_core::init_tracing;
use tracing::info;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "simgraph", about = "Similarity graph builder for exploratory search")]
struct Cli {
    /// Use the deterministic offline embedder instead of the hosted provider
    #[arg(long, global = true)]
    offline: bool,
    /// Directory holding default.toml and the RUN_MODE override
    #[arg(long, global = true, default_value = "config")]
    config_dir: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the similarity graph for a query and print it as JSON
    Search {
        query: String,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Embed catalog items missing from the cache and rewrite the cache file
    EmbedCatalog,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config_dir)
        .with_context(|| format!("failed to load configuration from {}", cli.config_dir.display()))?;
    let embedder = commands::embedder(&config.embedding, cli.offline)?;

    match cli.command {
        Command::Search { query, pretty } => {
            let graph = commands::search(&config, embedder, &query).await?;
            let out = if pretty {
                serde_json::to_string_pretty(&graph)?
            } else {
                serde_json::to_string(&graph)?
            };
            println!("{out}");
        }
        Command::EmbedCatalog => {
            let added = commands::embed_catalog(&config, embedder).await?;
            info!(added, cache = %config.catalog.cache_path, "catalog embeddings up to date");
        }
    }

    Ok(())
}
