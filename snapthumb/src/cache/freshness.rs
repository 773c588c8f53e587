//! Freshness oracle: mtime comparison between source and thumbnail.

use std::path::Path;
use tokio::fs;

/// Check whether a cached thumbnail is still valid for its source file.
///
/// A thumbnail is valid iff both files stat successfully and the
/// thumbnail's mtime is `>=` the source's mtime. Equal timestamps count
/// as valid to tolerate coarse filesystem time resolution. Any stat
/// failure (missing file, permission error) yields `false` - this
/// function never errors outward.
pub async fn is_up_to_date(original: &Path, thumbnail: &Path) -> bool {
    let original_meta = match fs::metadata(original).await {
        Ok(meta) => meta,
        Err(_) => return false,
    };
    let thumbnail_meta = match fs::metadata(thumbnail).await {
        Ok(meta) => meta,
        Err(_) => return false,
    };

    match (original_meta.modified(), thumbnail_meta.modified()) {
        (Ok(original_mtime), Ok(thumbnail_mtime)) => thumbnail_mtime >= original_mtime,
        _ => false,
    }
}
