//! Thumbnail cache: key derivation, freshness checks, and coordinated
//! generation.
//!
//! The cache maps `(original path, render options)` to a JPEG file in a
//! flat cache directory. Responsibilities are split across submodules:
//!
//! * [`key`]: deterministic key and on-disk path derivation.
//! * [`freshness`]: mtime-based staleness oracle.
//! * [`coalesce`]: in-flight request deduplication per cache key.
//! * [`pipeline`]: image decode, aspect-preserving resize, JPEG encode.
//! * [`events`]: observable lifecycle event channel.
//! * [`stats`]: on-disk cache statistics, index-independent.
//! * [`coordinator`]: the public [`ThumbnailCache`] tying it together.

mod coalesce;
mod coordinator;
mod events;
mod freshness;
mod key;
mod pipeline;
mod stats;
mod types;

pub use coalesce::{GenerationOutcome, InflightRegistry, OwnerGuard, Registration};
pub use coordinator::ThumbnailCache;
pub use events::{EventBus, ThumbnailEvent};
pub use freshness::is_up_to_date;
pub use key::{derive_key, thumbnail_path, THUMBNAIL_EXT};
pub use pipeline::{render_thumbnail, target_dimensions, EncodedThumbnail};
pub use stats::{format_size, CacheStats};
pub use types::{CacheKey, RenderOptions, RenderOverrides, ThumbnailError, ThumbnailRecord};
