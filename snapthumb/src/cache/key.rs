//! Cache key derivation and thumbnail path construction.
//!
//! The key is a SHA-256 digest over the original path and the render
//! options, rendered as lowercase hex. It is stable across process
//! restarts (no salt, no process-local state), is a valid filename
//! component everywhere, and makes collisions across distinct inputs
//! negligible for the lifetime of a cache directory.

use crate::cache::types::{CacheKey, RenderOptions};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// File extension of every cached thumbnail.
pub const THUMBNAIL_EXT: &str = "jpg";

/// Derive the cache key for one rendering of one source file.
///
/// Pure and repeatable: identical inputs produce identical keys across
/// calls and process restarts.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use snapthumb::cache::{derive_key, RenderOptions};
///
/// let key = derive_key(Path::new("/shots/a.png"), &RenderOptions::default());
/// assert_eq!(key.as_str().len(), 64);
/// ```
pub fn derive_key(original_path: &Path, options: &RenderOptions) -> CacheKey {
    let mut hasher = Sha256::new();
    // Exact path bytes: lossy conversion would collapse distinct
    // non-UTF-8 paths onto the same replacement character.
    hasher.update(original_path.as_os_str().as_encoded_bytes());
    hasher.update(b"|");
    hasher.update(options.width.to_le_bytes());
    hasher.update(options.height.to_le_bytes());
    hasher.update([options.quality]);

    CacheKey::from_hex(format!("{:x}", hasher.finalize()))
}

/// Construct the on-disk path for a cache key.
///
/// The cache directory is flat: `<cache_dir>/<key>.jpg`, no
/// subdirectories and no sidecar metadata. Pure function, no I/O.
pub fn thumbnail_path(cache_dir: &Path, key: &CacheKey) -> PathBuf {
    cache_dir.join(format!("{}.{}", key, THUMBNAIL_EXT))
}
