//! Lifecycle events emitted by the thumbnail cache.
//!
//! Events are an observable side channel, not a wire protocol. Emission
//! is fire-and-forget: producers never wait for consumers, and events
//! sent while nobody is subscribed are dropped. Delivery order matches
//! emission order for any single subscriber. Nothing survives a process
//! restart.

use crate::cache::types::ThumbnailRecord;
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Events emitted by cache operations.
#[derive(Debug, Clone)]
pub enum ThumbnailEvent {
    /// A thumbnail was generated and persisted.
    Generated(ThumbnailRecord),

    /// A generation attempt failed. The request itself resolved to
    /// not-found; this event carries the cause.
    Failed {
        original_path: PathBuf,
        error: String,
    },

    /// A thumbnail was removed (idempotent - also emitted when the
    /// file was already absent).
    Removed {
        original_path: PathBuf,
        thumbnail_path: PathBuf,
    },

    /// The whole cache directory was cleared.
    CacheCleared,

    /// Progress after each pregeneration batch.
    PregenerateProgress { processed: usize, total: usize },
}

/// Broadcast bus for [`ThumbnailEvent`]s.
///
/// Cloneable handle; every subscriber gets its own receiver. Slow
/// subscribers that fall more than the channel capacity behind lose
/// the oldest events (tokio broadcast lag semantics).
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ThumbnailEvent>,
}

impl EventBus {
    /// Create a bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to events emitted from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<ThumbnailEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all current subscribers.
    pub(crate) fn emit(&self, event: ThumbnailEvent) {
        // A send error only means there are no subscribers right now.
        let _ = self.tx.send(event);
    }
}
