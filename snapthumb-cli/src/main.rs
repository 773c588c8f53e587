//! snapthumb CLI - thumbnail cache maintenance.
//!
//! This binary provides a command-line interface to the snapthumb
//! library: one-shot generation, bulk pregeneration, and cache
//! maintenance (stats, clear, orphan cleanup).

mod commands;
mod error;

use clap::{Parser, Subcommand};
use snapthumb::cache::ThumbnailCache;
use snapthumb::config::CacheConfig;
use std::path::PathBuf;

use crate::commands::cache::CacheAction;
use crate::commands::generate::GenerateArgs;
use crate::commands::pregenerate::PregenerateArgs;
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "snapthumb")]
#[command(about = "Thumbnail cache for the screenshot library", version = snapthumb::VERSION)]
struct Cli {
    /// Override the thumbnail cache directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate (or reuse) the thumbnail for a single image
    Generate(GenerateArgs),
    /// Warm the cache for every image under a directory
    Pregenerate(PregenerateArgs),
    /// Cache maintenance
    #[command(subcommand)]
    Cache(CacheAction),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _logging_guard = match snapthumb::logging::init_logging("logs", "snapthumb.log") {
        Ok(guard) => guard,
        Err(err) => CliError::LoggingInit(err.to_string()).exit(),
    };

    let config = match cli.cache_dir {
        Some(dir) => CacheConfig::new(dir),
        None => CacheConfig::default(),
    };

    let cache = match ThumbnailCache::new(config) {
        Ok(cache) => cache,
        Err(err) => CliError::CacheInit(err).exit(),
    };

    let result = match cli.command {
        Command::Generate(args) => commands::generate::run(&cache, args).await,
        Command::Pregenerate(args) => commands::pregenerate::run(&cache, args).await,
        Command::Cache(action) => commands::cache::run(&cache, action).await,
    };

    if let Err(err) = result {
        err.exit();
    }
}
