//! Generation coordinator: the public thumbnail cache.
//!
//! Owns the in-memory metadata index and the in-flight registry, and
//! drives the request flow: derive key, consult the freshness oracle,
//! coalesce concurrent requests, run the image pipeline, persist the
//! result, and emit lifecycle events.
//!
//! Error policy: `get_thumbnail` never surfaces an error to its caller.
//! Failures resolve to `None` and are reported through the event
//! channel and the log. A subsequent explicit call is the retry
//! mechanism; nothing here is fatal to the hosting process.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::future::join_all;
use tokio::fs;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::cache::coalesce::{InflightRegistry, Registration};
use crate::cache::events::{EventBus, ThumbnailEvent};
use crate::cache::freshness::is_up_to_date;
use crate::cache::key::{derive_key, thumbnail_path};
use crate::cache::pipeline;
use crate::cache::stats::CacheStats;
use crate::cache::types::{
    CacheKey, RenderOptions, RenderOverrides, ThumbnailError, ThumbnailRecord,
};
use crate::config::CacheConfig;

/// Disk-backed thumbnail cache with per-key generation coalescing.
///
/// A single instance serves many concurrent callers. The metadata index
/// is a process-lifetime cache only; the thumbnail files and their
/// mtimes are the durable source of truth.
pub struct ThumbnailCache {
    config: CacheConfig,
    /// Metadata for generations performed by this process, keyed by
    /// cache key. Never consulted for validity decisions.
    index: Mutex<HashMap<CacheKey, ThumbnailRecord>>,
    inflight: InflightRegistry,
    events: EventBus,
}

impl ThumbnailCache {
    /// Create a cache rooted at `config.cache_dir`.
    ///
    /// Creates the cache directory up front; the cache accepts no
    /// requests until this has succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::CacheDir`] if the directory cannot be
    /// created.
    pub fn new(config: CacheConfig) -> Result<Self, ThumbnailError> {
        std::fs::create_dir_all(&config.cache_dir).map_err(|source| {
            ThumbnailError::CacheDir {
                path: config.cache_dir.clone(),
                source,
            }
        })?;

        info!(dir = %config.cache_dir.display(), "thumbnail cache ready");

        let events = EventBus::new(config.event_capacity);
        Ok(Self {
            config,
            index: Mutex::new(HashMap::new()),
            inflight: InflightRegistry::new(),
            events,
        })
    }

    /// Subscribe to lifecycle events emitted from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<ThumbnailEvent> {
        self.events.subscribe()
    }

    /// The configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get the thumbnail path for a source file, generating it if the
    /// cached copy is missing or stale.
    ///
    /// Concurrent calls for the same `(path, options)` coalesce onto a
    /// single generation; every caller observes that generation's
    /// outcome. Returns `None` when generation fails - the cause is
    /// reported via [`ThumbnailEvent::Failed`], never thrown.
    pub async fn get_thumbnail(
        &self,
        original: &Path,
        overrides: Option<RenderOverrides>,
    ) -> Option<PathBuf> {
        let options = self.config.default_options.merge(overrides);
        if let Err(err) = options.validate() {
            warn!(path = %original.display(), error = %err, "rejecting thumbnail request");
            self.events.emit(ThumbnailEvent::Failed {
                original_path: original.to_path_buf(),
                error: err.to_string(),
            });
            return None;
        }

        let key = derive_key(original, &options);
        let thumb_path = thumbnail_path(&self.config.cache_dir, &key);

        let owner = match self.inflight.register(&key) {
            Registration::Owner(guard) => guard,
            waiter @ Registration::Waiter(_) => {
                return match waiter.wait_for_outcome(self.config.wait_timeout).await {
                    Some(outcome) => outcome,
                    // Timed out or the owner was cancelled: re-check the disk.
                    None => {
                        warn!(key = %key, "coalesced wait ended without an outcome, re-checking disk");
                        fs::metadata(&thumb_path).await.is_ok().then_some(thumb_path)
                    }
                };
            }
        };

        let outcome = if is_up_to_date(original, &thumb_path).await {
            debug!(path = %original.display(), "thumbnail cache hit");
            Some(thumb_path)
        } else {
            self.generate(original, &key, &options).await
        };

        // Completing releases the in-flight entry; if this future is
        // dropped before reaching here, the guard releases it on drop.
        owner.complete(outcome.clone());
        outcome
    }

    /// Get a thumbnail as an embeddable base64 data URI.
    ///
    /// A read failure (file vanished between generation and read)
    /// yields `None`, not an error.
    pub async fn get_thumbnail_encoded(
        &self,
        original: &Path,
        overrides: Option<RenderOverrides>,
    ) -> Option<String> {
        let thumb_path = self.get_thumbnail(original, overrides).await?;

        match fs::read(&thumb_path).await {
            Ok(bytes) => Some(format!("data:image/jpeg;base64,{}", BASE64.encode(bytes))),
            Err(err) => {
                warn!(path = %thumb_path.display(), error = %err, "thumbnail unreadable after generation");
                None
            }
        }
    }

    /// Warm the cache for a list of source files.
    ///
    /// Files are processed in fixed-size batches; within a batch all
    /// generations run concurrently, across batches submission order is
    /// preserved. A [`ThumbnailEvent::PregenerateProgress`] event is
    /// emitted after each batch, followed by a brief pause so bulk work
    /// never monopolizes I/O. Per-file failures are logged and do not
    /// abort the batch or its successors.
    ///
    /// Returns the number of thumbnails that resolved successfully.
    pub async fn pregenerate(
        &self,
        paths: &[PathBuf],
        overrides: Option<RenderOverrides>,
    ) -> usize {
        let total = paths.len();
        let batch_size = self.config.batch_size.max(1);
        let mut processed = 0;
        let mut succeeded = 0;

        for batch in paths.chunks(batch_size) {
            let results = join_all(
                batch
                    .iter()
                    .map(|path| self.get_thumbnail(path, overrides)),
            )
            .await;

            processed += batch.len();
            succeeded += results.iter().filter(|r| r.is_some()).count();

            self.events.emit(ThumbnailEvent::PregenerateProgress { processed, total });
            debug!(processed, total, "pregeneration batch complete");

            if processed < total {
                tokio::time::sleep(self.config.batch_pause).await;
            }
        }

        info!(total, succeeded, "pregeneration finished");
        succeeded
    }

    /// Delete every file in the cache directory and clear the index.
    ///
    /// Per-file deletion failures are logged and skipped. Returns the
    /// number of files removed.
    ///
    /// # Errors
    ///
    /// Returns an error only when the cache directory itself cannot be
    /// listed.
    pub async fn clear_cache(&self) -> Result<u64, ThumbnailError> {
        let mut entries = fs::read_dir(&self.config.cache_dir).await?;
        let mut removed = 0u64;

        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    let is_file = entry
                        .file_type()
                        .await
                        .map(|t| t.is_file())
                        .unwrap_or(false);
                    if !is_file {
                        continue;
                    }
                    match fs::remove_file(&path).await {
                        Ok(()) => removed += 1,
                        Err(err) => {
                            warn!(path = %path.display(), error = %err, "failed to delete cached thumbnail");
                        }
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "cache directory listing interrupted");
                    break;
                }
            }
        }

        self.index.lock().unwrap().clear();
        self.events.emit(ThumbnailEvent::CacheCleared);
        info!(removed, "cache cleared");

        Ok(removed)
    }

    /// Remove the cached thumbnail for a source file, if any.
    ///
    /// Idempotent: absence of the file is not an error, and the
    /// [`ThumbnailEvent::Removed`] event is emitted either way. A delete
    /// that fails for any other reason emits [`ThumbnailEvent::Failed`]
    /// instead and leaves the index entry in place.
    pub async fn remove_thumbnail(&self, original: &Path, overrides: Option<RenderOverrides>) {
        let options = self.config.default_options.merge(overrides);
        let key = derive_key(original, &options);
        let thumb_path = thumbnail_path(&self.config.cache_dir, &key);

        match fs::remove_file(&thumb_path).await {
            Ok(()) => debug!(path = %thumb_path.display(), "thumbnail removed"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %thumb_path.display(), error = %err, "failed to remove thumbnail");
                self.events.emit(ThumbnailEvent::Failed {
                    original_path: original.to_path_buf(),
                    error: err.to_string(),
                });
                return;
            }
        }

        self.index.lock().unwrap().remove(&key);
        self.events.emit(ThumbnailEvent::Removed {
            original_path: original.to_path_buf(),
            thumbnail_path: thumb_path,
        });
    }

    /// On-disk cache statistics, independent of the in-memory index.
    pub async fn stats(&self) -> CacheStats {
        CacheStats::scan(&self.config.cache_dir).await
    }

    /// Delete thumbnails whose source file no longer exists.
    ///
    /// Best-effort reconciliation over the records this process has
    /// indexed: a thumbnail generated by an earlier process is invisible
    /// here and survives until regenerated or cleared. Returns the
    /// number of thumbnail files deleted.
    pub async fn cleanup_orphans(&self) -> usize {
        let snapshot: Vec<(CacheKey, ThumbnailRecord)> = self
            .index
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut removed = 0;
        for (key, record) in snapshot {
            if fs::metadata(&record.original_path).await.is_ok() {
                continue;
            }

            match fs::remove_file(&record.thumbnail_path).await {
                Ok(()) => {
                    debug!(
                        original = %record.original_path.display(),
                        thumbnail = %record.thumbnail_path.display(),
                        "removed orphaned thumbnail"
                    );
                    removed += 1;
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => {
                    warn!(path = %record.thumbnail_path.display(), error = %err, "failed to remove orphaned thumbnail");
                    continue;
                }
            }

            self.index.lock().unwrap().remove(&key);
        }

        if removed > 0 {
            info!(removed, "orphan cleanup finished");
        }
        removed
    }

    /// Number of records in the in-memory index.
    pub fn indexed_count(&self) -> usize {
        self.index.lock().unwrap().len()
    }

    /// Run the image pipeline and persist the result.
    async fn generate(
        &self,
        original: &Path,
        key: &CacheKey,
        options: &RenderOptions,
    ) -> Option<PathBuf> {
        match self.try_generate(original, key, options).await {
            Ok(record) => {
                let path = record.thumbnail_path.clone();
                self.index.lock().unwrap().insert(key.clone(), record.clone());
                debug!(
                    original = %record.original_path.display(),
                    width = record.width,
                    height = record.height,
                    "thumbnail generated"
                );
                self.events.emit(ThumbnailEvent::Generated(record));
                Some(path)
            }
            Err(err) => {
                warn!(path = %original.display(), error = %err, "thumbnail generation failed");
                self.events.emit(ThumbnailEvent::Failed {
                    original_path: original.to_path_buf(),
                    error: err.to_string(),
                });
                None
            }
        }
    }

    async fn try_generate(
        &self,
        original: &Path,
        key: &CacheKey,
        options: &RenderOptions,
    ) -> Result<ThumbnailRecord, ThumbnailError> {
        let bytes = fs::read(original).await?;

        let render_options = *options;
        let rendered =
            tokio::task::spawn_blocking(move || pipeline::render_thumbnail(&bytes, &render_options))
                .await??;

        let thumb_path = thumbnail_path(&self.config.cache_dir, key);
        fs::write(&thumb_path, &rendered.bytes).await?;

        // Stat the source after the write so the recorded mtime is the
        // one the freshness oracle will compare against.
        let original_modified_at = fs::metadata(original)
            .await?
            .modified()
            .unwrap_or_else(|_| SystemTime::now());

        Ok(ThumbnailRecord {
            original_path: original.to_path_buf(),
            thumbnail_path: thumb_path,
            original_modified_at,
            generated_at: SystemTime::now(),
            width: rendered.width,
            height: rendered.height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use image::{DynamicImage, RgbImage};
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .save(&path)
            .unwrap();
        path
    }

    fn test_cache(dir: &TempDir) -> ThumbnailCache {
        ThumbnailCache::new(CacheConfig::new(dir.path().join("thumbs"))).unwrap()
    }

    #[tokio::test]
    async fn test_generates_on_miss() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let shot = write_image(dir.path(), "shot.png", 40, 20);

        let thumb = cache.get_thumbnail(&shot, None).await.unwrap();

        assert!(thumb.exists());
        assert_eq!(cache.indexed_count(), 1);
    }

    #[tokio::test]
    async fn test_second_request_reuses_cached_file() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let shot = write_image(dir.path(), "shot.png", 40, 20);
        let mut events = cache.subscribe();

        let first = cache.get_thumbnail(&shot, None).await.unwrap();
        let second = cache.get_thumbnail(&shot, None).await.unwrap();

        assert_eq!(first, second);
        // Exactly one generation event; the second call was a cache hit.
        assert!(matches!(events.recv().await, Ok(ThumbnailEvent::Generated(_))));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stale_thumbnail_is_regenerated() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let shot = write_image(dir.path(), "shot.png", 40, 20);

        let thumb = cache.get_thumbnail(&shot, None).await.unwrap();

        // Rewrite the source in the future relative to the thumbnail.
        let future = FileTime::from_unix_time(
            FileTime::from_last_modification_time(&std::fs::metadata(&thumb).unwrap())
                .unix_seconds()
                + 10,
            0,
        );
        set_file_mtime(&shot, future).unwrap();

        let mut events = cache.subscribe();
        cache.get_thumbnail(&shot, None).await.unwrap();

        assert!(matches!(events.recv().await, Ok(ThumbnailEvent::Generated(_))));
    }

    #[tokio::test]
    async fn test_missing_source_is_not_found() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let mut events = cache.subscribe();

        let result = cache
            .get_thumbnail(&dir.path().join("nope.png"), None)
            .await;

        assert!(result.is_none());
        assert!(matches!(events.recv().await, Ok(ThumbnailEvent::Failed { .. })));
    }

    #[tokio::test]
    async fn test_corrupt_source_is_not_found() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let bogus = dir.path().join("bogus.png");
        std::fs::write(&bogus, b"not an image at all").unwrap();
        let mut events = cache.subscribe();

        let result = cache.get_thumbnail(&bogus, None).await;

        assert!(result.is_none());
        match events.recv().await {
            Ok(ThumbnailEvent::Failed { original_path, .. }) => {
                assert_eq!(original_path, bogus);
            }
            other => panic!("expected Failed event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_options_rejected_at_boundary() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let shot = write_image(dir.path(), "shot.png", 40, 20);

        let result = cache
            .get_thumbnail(
                &shot,
                Some(RenderOverrides {
                    width: Some(0),
                    ..Default::default()
                }),
            )
            .await;

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_overrides_produce_distinct_thumbnails() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let shot = write_image(dir.path(), "shot.png", 40, 20);

        let default = cache.get_thumbnail(&shot, None).await.unwrap();
        let small = cache
            .get_thumbnail(
                &shot,
                Some(RenderOverrides {
                    width: Some(100),
                    height: Some(100),
                    quality: None,
                }),
            )
            .await
            .unwrap();

        assert_ne!(default, small);
        assert_eq!(cache.indexed_count(), 2);
    }

    #[tokio::test]
    async fn test_encoded_payload_is_data_uri() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let shot = write_image(dir.path(), "shot.png", 40, 20);

        let encoded = cache.get_thumbnail_encoded(&shot, None).await.unwrap();

        assert!(encoded.starts_with("data:image/jpeg;base64,"));
        assert!(encoded.len() > "data:image/jpeg;base64,".len());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent_and_emits() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let shot = write_image(dir.path(), "shot.png", 40, 20);

        let thumb = cache.get_thumbnail(&shot, None).await.unwrap();
        let mut events = cache.subscribe();

        cache.remove_thumbnail(&shot, None).await;
        assert!(!thumb.exists());
        assert!(matches!(events.recv().await, Ok(ThumbnailEvent::Removed { .. })));

        // Removing again succeeds and still emits.
        cache.remove_thumbnail(&shot, None).await;
        assert!(matches!(events.recv().await, Ok(ThumbnailEvent::Removed { .. })));
        assert_eq!(cache.indexed_count(), 0);
    }

    #[tokio::test]
    async fn test_clear_cache_removes_everything() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let a = write_image(dir.path(), "a.png", 40, 20);
        let b = write_image(dir.path(), "b.png", 20, 40);

        cache.get_thumbnail(&a, None).await.unwrap();
        cache.get_thumbnail(&b, None).await.unwrap();
        let mut events = cache.subscribe();

        let removed = cache.clear_cache().await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(cache.indexed_count(), 0);
        assert_eq!(cache.stats().await.total_thumbnails, 0);
        assert!(matches!(events.recv().await, Ok(ThumbnailEvent::CacheCleared)));
    }

    #[tokio::test]
    async fn test_cleanup_orphans_targets_deleted_sources() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let kept = write_image(dir.path(), "kept.png", 40, 20);
        let doomed = write_image(dir.path(), "doomed.png", 20, 40);

        let kept_thumb = cache.get_thumbnail(&kept, None).await.unwrap();
        let doomed_thumb = cache.get_thumbnail(&doomed, None).await.unwrap();

        std::fs::remove_file(&doomed).unwrap();
        let removed = cache.cleanup_orphans().await;

        assert_eq!(removed, 1);
        assert!(kept_thumb.exists());
        assert!(!doomed_thumb.exists());
        assert_eq!(cache.indexed_count(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_orphans_empty_index() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);

        assert_eq!(cache.cleanup_orphans().await, 0);
    }

    #[tokio::test]
    async fn test_cancelled_request_does_not_wedge_key() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let shot = write_image(dir.path(), "shot.png", 400, 200);

        // First call dropped mid-generation by a caller-side timeout.
        let cancelled =
            tokio::time::timeout(Duration::ZERO, cache.get_thumbnail(&shot, None)).await;
        assert!(cancelled.is_err());

        // The key must be released, not wedged: a retry generates.
        assert!(cache.inflight.is_empty());
        let thumb = cache.get_thumbnail(&shot, None).await;
        assert!(thumb.is_some());
    }

    #[tokio::test]
    async fn test_waiter_timeout_resolves_from_disk() {
        let dir = TempDir::new().unwrap();
        let config = CacheConfig::new(dir.path().join("thumbs"))
            .with_wait_timeout(Duration::from_millis(10));
        let cache = ThumbnailCache::new(config).unwrap();
        let shot = write_image(dir.path(), "shot.png", 40, 20);

        // Thumbnail already on disk from an earlier request.
        let thumb = cache.get_thumbnail(&shot, None).await.unwrap();

        // Wedge the key with an owner that never completes.
        let key = derive_key(&shot, &cache.config.default_options);
        let stuck = cache.inflight.register(&key);
        assert!(stuck.is_owner());

        // The coalesced request times out and resolves from disk.
        let resolved = cache.get_thumbnail(&shot, None).await;
        assert_eq!(resolved, Some(thumb));
        drop(stuck);
    }

    #[tokio::test]
    async fn test_remove_failure_emits_failed_not_removed() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let shot = write_image(dir.path(), "shot.png", 40, 20);
        let thumb = cache.get_thumbnail(&shot, None).await.unwrap();

        // A directory at the thumbnail path makes the unlink fail with
        // something other than NotFound.
        std::fs::remove_file(&thumb).unwrap();
        std::fs::create_dir(&thumb).unwrap();
        let mut events = cache.subscribe();

        cache.remove_thumbnail(&shot, None).await;

        assert!(matches!(events.recv().await, Ok(ThumbnailEvent::Failed { .. })));
        assert!(events.try_recv().is_err(), "no Removed event for a failed delete");
        assert_eq!(cache.indexed_count(), 1);
    }

    #[tokio::test]
    async fn test_encoded_unreadable_thumbnail_is_not_found() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let shot = write_image(dir.path(), "shot.png", 40, 20);
        let thumb = cache.get_thumbnail(&shot, None).await.unwrap();

        // Fresh mtime but unreadable as a file.
        std::fs::remove_file(&thumb).unwrap();
        std::fs::create_dir(&thumb).unwrap();

        assert!(cache.get_thumbnail_encoded(&shot, None).await.is_none());
    }

    #[tokio::test]
    async fn test_rendered_thumbnail_preserves_aspect() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir);
        let shot = write_image(dir.path(), "wide.png", 400, 200);

        let thumb = cache.get_thumbnail(&shot, None).await.unwrap();
        let rendered = image::open(&thumb).unwrap();

        assert_eq!((rendered.width(), rendered.height()), (200, 100));
    }
}
