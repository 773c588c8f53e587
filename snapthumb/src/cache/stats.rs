//! On-disk cache statistics.
//!
//! Statistics are computed by scanning the cache directory, never from
//! the in-memory index, so they stay correct on a cold process whose
//! index is empty.

use crate::cache::key::THUMBNAIL_EXT;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

/// Snapshot of the on-disk thumbnail cache.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of thumbnail files in the cache directory.
    pub total_thumbnails: u64,
    /// Combined size of all thumbnail files in bytes.
    pub cache_size_bytes: u64,
    /// The directory that was scanned.
    pub cache_directory: PathBuf,
}

impl CacheStats {
    /// Scan a cache directory, counting thumbnail files by extension.
    ///
    /// An unreadable directory degrades to empty stats with a warning
    /// rather than an error.
    pub async fn scan(cache_dir: &Path) -> Self {
        let mut stats = Self {
            total_thumbnails: 0,
            cache_size_bytes: 0,
            cache_directory: cache_dir.to_path_buf(),
        };

        let mut entries = match fs::read_dir(cache_dir).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %cache_dir.display(), error = %err, "cache directory not readable, reporting empty stats");
                return stats;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(THUMBNAIL_EXT) {
                continue;
            }
            match entry.metadata().await {
                Ok(meta) if meta.is_file() => {
                    stats.total_thumbnails += 1;
                    stats.cache_size_bytes += meta.len();
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable cache entry");
                }
            }
        }

        stats
    }
}

/// Format a byte count for human consumption.
pub fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

    let bytes_f = bytes as f64;
    if bytes_f >= GIB {
        format!("{:.2} GiB", bytes_f / GIB)
    } else if bytes_f >= MIB {
        format!("{:.2} MiB", bytes_f / MIB)
    } else if bytes_f >= KIB {
        format!("{:.2} KiB", bytes_f / KIB)
    } else {
        format!("{} B", bytes)
    }
}
