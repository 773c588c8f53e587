//! Thumbnail cache configuration.

use crate::cache::RenderOptions;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a [`ThumbnailCache`](crate::cache::ThumbnailCache).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Flat directory holding the cached thumbnails.
    pub cache_dir: PathBuf,
    /// Options applied when a request carries no overrides.
    pub default_options: RenderOptions,
    /// Number of thumbnails generated concurrently per pregeneration
    /// batch. Bounds file-handle and memory pressure while still
    /// parallelizing within a batch.
    pub batch_size: usize,
    /// Pause between pregeneration batches, yielding I/O and CPU to
    /// on-demand requests.
    pub batch_pause: Duration,
    /// Upper bound on how long a coalesced request waits for the
    /// in-flight generation before re-checking the disk itself.
    pub wait_timeout: Duration,
    /// Capacity of the lifecycle event channel.
    pub event_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("snapthumb")
            .join("thumbnails");

        Self {
            cache_dir,
            default_options: RenderOptions::default(),
            batch_size: 5,
            batch_pause: Duration::from_millis(10),
            wait_timeout: Duration::from_secs(30),
            event_capacity: 64,
        }
    }
}

impl CacheConfig {
    /// Create a configuration rooted at the given cache directory.
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            ..Self::default()
        }
    }

    /// Set the default render options.
    pub fn with_default_options(mut self, options: RenderOptions) -> Self {
        self.default_options = options;
        self
    }

    /// Set the pregeneration batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the pause between pregeneration batches.
    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    /// Set the bounded wait for coalesced requests.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();

        assert!(config.cache_dir.ends_with("snapthumb/thumbnails"));
        assert_eq!(config.default_options, RenderOptions::default());
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.batch_pause, Duration::from_millis(10));
        assert_eq!(config.wait_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_config_builder() {
        let options = RenderOptions {
            width: 128,
            height: 128,
            quality: 70,
        };
        let config = CacheConfig::new(PathBuf::from("/tmp/thumbs"))
            .with_default_options(options)
            .with_batch_size(8)
            .with_batch_pause(Duration::from_millis(5))
            .with_wait_timeout(Duration::from_secs(10));

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/thumbs"));
        assert_eq!(config.default_options, options);
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.batch_pause, Duration::from_millis(5));
        assert_eq!(config.wait_timeout, Duration::from_secs(10));
    }
}
