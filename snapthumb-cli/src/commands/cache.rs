//! Cache maintenance CLI commands.

use clap::Subcommand;
use snapthumb::cache::{format_size, ThumbnailCache};

use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show cache statistics
    Stats,
    /// Delete every cached thumbnail
    Clear,
    /// Delete thumbnails whose source file no longer exists
    Cleanup,
}

/// Run a cache subcommand.
pub async fn run(cache: &ThumbnailCache, action: CacheAction) -> Result<(), CliError> {
    match action {
        CacheAction::Stats => {
            let stats = cache.stats().await;
            println!("Thumbnail cache: {}", stats.cache_directory.display());
            println!("  Thumbnails: {}", stats.total_thumbnails);
            println!("  Size:       {}", format_size(stats.cache_size_bytes));
            Ok(())
        }
        CacheAction::Clear => {
            println!(
                "Clearing thumbnail cache at: {}",
                cache.config().cache_dir.display()
            );
            match cache.clear_cache().await {
                Ok(removed) => {
                    println!("Deleted {} files", removed);
                    Ok(())
                }
                Err(err) => Err(CliError::CacheClear(err)),
            }
        }
        CacheAction::Cleanup => {
            let removed = cache.cleanup_orphans().await;
            if removed == 0 {
                println!("No orphaned thumbnails found");
            } else {
                println!("Removed {} orphaned thumbnails", removed);
            }
            Ok(())
        }
    }
}
