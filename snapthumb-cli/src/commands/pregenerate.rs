//! Batch cache warm-up over a directory of screenshots.

use clap::Args;
use snapthumb::cache::{ThumbnailCache, ThumbnailEvent};
use std::path::PathBuf;
use tracing::debug;
use walkdir::WalkDir;

use crate::commands::RenderArgs;
use crate::error::CliError;

/// Raster extensions the screenshot library produces.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Arguments for the `pregenerate` command.
#[derive(Debug, Args)]
pub struct PregenerateArgs {
    /// Directory to scan for images
    pub dir: PathBuf,

    #[command(flatten)]
    pub render: RenderArgs,
}

/// Run the `pregenerate` command.
pub async fn run(cache: &ThumbnailCache, args: PregenerateArgs) -> Result<(), CliError> {
    let paths = collect_images(&args.dir)?;
    if paths.is_empty() {
        println!("No images found under {}", args.dir.display());
        return Ok(());
    }

    println!("Pregenerating {} thumbnails...", paths.len());

    // Relay batch progress while the warm-up runs.
    let mut events = cache.subscribe();
    let progress = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let ThumbnailEvent::PregenerateProgress { processed, total } = event {
                println!("  {}/{}", processed, total);
                if processed >= total {
                    break;
                }
            }
        }
    });

    let succeeded = cache.pregenerate(&paths, args.render.overrides()).await;
    let _ = progress.await;

    println!(
        "Done: {} generated or reused, {} failed",
        succeeded,
        paths.len() - succeeded
    );
    Ok(())
}

/// Collect image files under a directory, recursively.
fn collect_images(dir: &PathBuf) -> Result<Vec<PathBuf>, CliError> {
    if !dir.is_dir() {
        return Err(CliError::Walk {
            dir: dir.clone(),
            error: "not a directory".to_string(),
        });
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| CliError::Walk {
            dir: dir.clone(),
            error: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_image {
            paths.push(path);
        } else {
            debug!(path = %path.display(), "skipping non-image file");
        }
    }

    paths.sort();
    Ok(paths)
}
