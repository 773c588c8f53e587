//! snapthumb - disk-backed thumbnail cache for a screenshot library.
//!
//! Given an original image file and a set of render options (target box,
//! JPEG quality), the cache produces a small preview, persists it under a
//! flat cache directory, detects when a cached preview has gone stale
//! relative to its source file, and coalesces concurrent requests for the
//! same rendering into a single generation.
//!
//! # High-Level API
//!
//! ```ignore
//! use snapthumb::cache::ThumbnailCache;
//! use snapthumb::config::CacheConfig;
//!
//! let cache = ThumbnailCache::new(CacheConfig::default())?;
//!
//! // Returns the cached path, generating the thumbnail if needed.
//! let thumb = cache.get_thumbnail(&screenshot_path, None).await;
//! ```

pub mod cache;
pub mod config;
pub mod logging;

/// Version of the snapthumb library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
