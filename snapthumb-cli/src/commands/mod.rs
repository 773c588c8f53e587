//! CLI command handlers.

pub mod cache;
pub mod generate;
pub mod pregenerate;

use clap::Args;
use snapthumb::cache::RenderOverrides;

/// Render option flags shared by generation commands.
#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Maximum thumbnail width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Maximum thumbnail height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// JPEG quality, 1-100
    #[arg(long)]
    pub quality: Option<u8>,
}

impl RenderArgs {
    /// Convert to library overrides; `None` when no flag was given.
    pub fn overrides(&self) -> Option<RenderOverrides> {
        if self.width.is_none() && self.height.is_none() && self.quality.is_none() {
            return None;
        }
        Some(RenderOverrides {
            width: self.width,
            height: self.height,
            quality: self.quality,
        })
    }
}
