mod commands;
mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use catalog_sync::SyncRunner;
use catalog_sync_inksoft::InkSoftConnector;
use catalog_sync_store::CatalogStore;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "catalog-sync")]
#[command(about = "Sync InkSoft store catalogs into a local product catalog")]
struct Cli {
    /// Config file (defaults to ~/.config/catalog-sync/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Catalog database (defaults to the user cache directory)
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the stores a full sync would visit
    Start,
    /// Sync one page of one store
    Chunk {
        store: String,
        #[arg(long, default_value_t = 0)]
        page: u32,
        /// Products per page (defaults to the configured page size)
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Show the accumulated sync log of a store
    Status {
        store: String,
        /// Clear the log instead of printing it
        #[arg(long)]
        clear: bool,
    },
    /// Sync every configured store to completion
    Sync,
    /// Delete destination products that no longer exist remotely
    Prune { store: String },
    /// List a store's remote products
    Products { store: String },
    /// Sync a single product by remote ID
    Product { store: String, id: i64 },
    /// Check connectivity to one store, or to every configured store
    Check { store: Option<String> },
}

fn cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("could not determine cache directory")?;
    let dir = base.join("catalog-sync");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create cache directory: {}", dir.display()))?;
    Ok(dir)
}

fn db_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(cache_dir()?.join("catalog.db")),
    }
}

fn build_runner(cli: &Cli) -> Result<SyncRunner> {
    let settings = config::load_settings(cli.config.as_deref())?;
    let path = db_path(cli.database.as_deref())?;
    tracing::debug!(path = %path.display(), stores = settings.stores.len(), "opening catalog");
    let store = Arc::new(
        CatalogStore::open(&path)
            .with_context(|| format!("failed to open catalog at {}", path.display()))?,
    );
    let connector = Arc::new(InkSoftConnector::new(Some(settings.base_url.clone())));

    Ok(SyncRunner::new(
        settings,
        connector,
        store.clone(),
        store.clone(),
        store,
    ))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CATALOG_SYNC_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let runner = build_runner(&cli)?;

    match cli.command {
        Command::Start => commands::start::run(&runner),
        Command::Chunk {
            store,
            page,
            page_size,
        } => commands::chunk::run(&runner, &store, page, page_size).await,
        Command::Status { store, clear } => commands::status::run(&runner, &store, clear).await,
        Command::Sync => commands::sync::run(&runner).await,
        Command::Prune { store } => commands::prune::run(&runner, &store).await,
        Command::Products { store } => commands::products::run(&runner, &store).await,
        Command::Product { store, id } => commands::product::run(&runner, &store, id).await,
        Command::Check { store } => commands::check::run(&runner, store.as_deref()).await,
    }
}
