//! Image pipeline: decode, aspect-preserving resize, JPEG encode.
//!
//! Pure CPU work over byte buffers; the coordinator runs it under
//! `spawn_blocking` so decode/encode never stall the async executor.

use crate::cache::types::{RenderOptions, ThumbnailError};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

/// A rendered thumbnail ready to be persisted.
#[derive(Debug, Clone)]
pub struct EncodedThumbnail {
    /// JPEG-encoded bytes.
    pub bytes: Vec<u8>,
    /// Rendered width in pixels.
    pub width: u32,
    /// Rendered height in pixels.
    pub height: u32,
}

/// Compute the output dimensions for a source image inside a target box.
///
/// Aspect ratio is always preserved: exactly one of width/height equals
/// the requested bound, the other is derived. Landscape (and wide-square)
/// sources clamp to the requested width; portrait sources clamp to the
/// requested height. The derived dimension is rounded and floors at 1.
pub fn target_dimensions(source_width: u32, source_height: u32, options: &RenderOptions) -> (u32, u32) {
    let aspect = source_width as f64 / source_height as f64;

    if aspect > 1.0 {
        let height = ((options.width as f64 / aspect).round() as u32).max(1);
        (options.width, height)
    } else {
        let width = ((options.height as f64 * aspect).round() as u32).max(1);
        (width, options.height)
    }
}

/// Render a thumbnail from raw image bytes.
///
/// Decodes with format sniffing, resizes with Lanczos3, and encodes as
/// JPEG at the requested quality. Corrupt or unsupported input surfaces
/// as [`ThumbnailError::Decode`].
pub fn render_thumbnail(
    bytes: &[u8],
    options: &RenderOptions,
) -> Result<EncodedThumbnail, ThumbnailError> {
    let source = image::load_from_memory(bytes).map_err(ThumbnailError::Decode)?;

    let (width, height) = target_dimensions(source.width(), source.height(), options);
    let resized = source.resize_exact(width, height, FilterType::Lanczos3);

    let mut encoded = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut encoded, options.quality);
    resized
        .write_with_encoder(encoder)
        .map_err(ThumbnailError::Encode)?;

    Ok(EncodedThumbnail {
        bytes: encoded,
        width,
        height,
    })
}
