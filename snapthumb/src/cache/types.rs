//! Core types for the thumbnail cache.

use std::path::PathBuf;
use std::time::SystemTime;
use thiserror::Error;

/// Render options for a thumbnail: target bounding box and JPEG quality.
///
/// Two `RenderOptions` with equal fields derive the same cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderOptions {
    /// Maximum thumbnail width in pixels.
    pub width: u32,
    /// Maximum thumbnail height in pixels.
    pub height: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 200,
            height: 200,
            quality: 80,
        }
    }
}

impl RenderOptions {
    /// Apply a partial override on top of these options.
    pub fn merge(self, overrides: Option<RenderOverrides>) -> Self {
        let Some(o) = overrides else { return self };
        Self {
            width: o.width.unwrap_or(self.width),
            height: o.height.unwrap_or(self.height),
            quality: o.quality.unwrap_or(self.quality),
        }
    }

    /// Validate the caller contract: positive dimensions, quality 1-100.
    pub fn validate(&self) -> Result<(), ThumbnailError> {
        if self.width == 0 || self.height == 0 {
            return Err(ThumbnailError::InvalidOptions(format!(
                "target box must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.quality == 0 || self.quality > 100 {
            return Err(ThumbnailError::InvalidOptions(format!(
                "quality must be 1-100, got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

/// Partial render options, merged over the configured defaults per call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: Option<u8>,
}

/// Cache key uniquely identifying one rendering of one source file.
///
/// Derived deterministically from `(original path, render options)` and
/// safe to use as a filename component on every target filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub(crate) fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// In-memory record of a successful generation.
///
/// The index holding these records is a process-lifetime cache of
/// metadata only. The durable source of truth is the thumbnail file
/// itself plus its mtime; a fresh process validates on-disk thumbnails
/// by direct stat comparison without repopulating the index.
#[derive(Debug, Clone)]
pub struct ThumbnailRecord {
    /// Source file the thumbnail was rendered from.
    pub original_path: PathBuf,
    /// On-disk location of the rendered thumbnail.
    pub thumbnail_path: PathBuf,
    /// Source file mtime observed after the successful generation.
    pub original_modified_at: SystemTime,
    /// When the thumbnail was generated.
    pub generated_at: SystemTime,
    /// Rendered thumbnail width in pixels.
    pub width: u32,
    /// Rendered thumbnail height in pixels.
    pub height: u32,
}

/// Thumbnail cache errors.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// I/O error during cache operations
    #[error("thumbnail I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Source image could not be decoded
    #[error("image decode failed: {0}")]
    Decode(image::ImageError),

    /// Thumbnail could not be encoded
    #[error("thumbnail encode failed: {0}")]
    Encode(image::ImageError),

    /// Render options violate the caller contract
    #[error("invalid render options: {0}")]
    InvalidOptions(String),

    /// Cache directory could not be created
    #[error("cache directory {path} could not be created: {source}")]
    CacheDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Background render task failed to complete
    #[error("render task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = RenderOptions::default();
        assert_eq!(options.width, 200);
        assert_eq!(options.height, 200);
        assert_eq!(options.quality, 80);
    }

    #[test]
    fn test_merge_none_keeps_defaults() {
        let options = RenderOptions::default().merge(None);
        assert_eq!(options, RenderOptions::default());
    }

    #[test]
    fn test_merge_partial_override() {
        let options = RenderOptions::default().merge(Some(RenderOverrides {
            width: Some(640),
            height: None,
            quality: Some(90),
        }));

        assert_eq!(options.width, 640);
        assert_eq!(options.height, 200);
        assert_eq!(options.quality, 90);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(RenderOptions::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_dimensions() {
        let options = RenderOptions {
            width: 0,
            height: 200,
            quality: 80,
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_quality() {
        let zero = RenderOptions {
            quality: 0,
            ..RenderOptions::default()
        };
        let over = RenderOptions {
            quality: 101,
            ..RenderOptions::default()
        };

        assert!(zero.validate().is_err());
        assert!(over.validate().is_err());
    }

    #[test]
    fn test_equal_options_are_equal() {
        let a = RenderOptions {
            width: 128,
            height: 128,
            quality: 75,
        };
        let b = RenderOptions {
            width: 128,
            height: 128,
            quality: 75,
        };
        assert_eq!(a, b);
    }
}
