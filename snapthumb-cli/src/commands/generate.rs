//! One-shot thumbnail generation command.

use clap::Args;
use snapthumb::cache::ThumbnailCache;
use std::path::PathBuf;

use crate::commands::RenderArgs;
use crate::error::CliError;

/// Arguments for the `generate` command.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Source image to render a thumbnail for
    pub path: PathBuf,

    #[command(flatten)]
    pub render: RenderArgs,

    /// Print the thumbnail as a base64 data URI instead of its path
    #[arg(long)]
    pub encoded: bool,
}

/// Run the `generate` command.
pub async fn run(cache: &ThumbnailCache, args: GenerateArgs) -> Result<(), CliError> {
    let overrides = args.render.overrides();

    if args.encoded {
        match cache.get_thumbnail_encoded(&args.path, overrides).await {
            Some(payload) => {
                println!("{}", payload);
                Ok(())
            }
            None => Err(CliError::Generate(args.path)),
        }
    } else {
        match cache.get_thumbnail(&args.path, overrides).await {
            Some(thumb) => {
                println!("{}", thumb.display());
                Ok(())
            }
            None => Err(CliError::Generate(args.path)),
        }
    }
}
