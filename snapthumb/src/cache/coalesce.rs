//! In-flight generation registry for request coalescing.
//!
//! When several callers ask for the same rendering while it is being
//! generated, only the first runs the image pipeline - the rest wait on
//! a broadcast channel and observe the single outcome. Generation is
//! therefore serialized per key, never globally: distinct keys proceed
//! concurrently.
//!
//! Uses `DashMap` so registration is an atomic check-and-insert without
//! a global lock, and `tokio::sync::broadcast` so every waiter receives
//! the terminal outcome. Ownership is held through an RAII guard: an
//! owner future that is dropped mid-generation (a lost `select!` arm, a
//! caller-side timeout) releases its entry on drop, so an abandoned
//! generation can never wedge its key. Waits are bounded too: a slow
//! generation cannot strand waiters forever.

use crate::cache::types::CacheKey;
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

/// Terminal outcome of one generation, shared with every waiter.
///
/// `Some(path)` on success, `None` when generation failed - waiters do
/// not re-trigger generation either way.
pub type GenerationOutcome = Option<PathBuf>;

/// Tracks cache keys currently undergoing generation.
pub struct InflightRegistry {
    inflight: DashMap<CacheKey, broadcast::Sender<GenerationOutcome>>,
    owners: AtomicU64,
    coalesced: AtomicU64,
}

/// Result of registering a request with the in-flight registry.
pub enum Registration<'a> {
    /// First request for this key: the caller must generate and call
    /// [`OwnerGuard::complete`]. Dropping the guard without completing
    /// releases the entry instead.
    Owner(OwnerGuard<'a>),
    /// Another generation is in flight: wait on the receiver.
    Waiter(broadcast::Receiver<GenerationOutcome>),
}

/// RAII ownership of one in-flight generation.
///
/// [`complete`](Self::complete) broadcasts the outcome and releases the
/// entry. If the guard is dropped without completing - the owning future
/// was cancelled - the entry is released silently; waiters observe a
/// closed channel and fall back to re-checking the disk, and the next
/// request for the key becomes a fresh owner.
pub struct OwnerGuard<'a> {
    registry: &'a InflightRegistry,
    key: CacheKey,
    completed: bool,
}

impl OwnerGuard<'_> {
    /// Complete the generation, broadcasting the outcome to all waiters
    /// and releasing the in-flight entry.
    pub fn complete(mut self, outcome: GenerationOutcome) {
        self.completed = true;
        if let Some((_, tx)) = self.registry.inflight.remove(&self.key) {
            let waiters = tx.receiver_count();
            // Send errors only mean every waiter already gave up.
            let _ = tx.send(outcome);
            if waiters > 0 {
                debug!(key = %self.key, waiters, "broadcast generation outcome to waiters");
            }
        }
    }
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        if !self.completed && self.registry.inflight.remove(&self.key).is_some() {
            // Dropping the sender closes the channel for all waiters.
            debug!(key = %self.key, "generation abandoned, releasing in-flight entry");
        }
    }
}

impl Registration<'_> {
    /// Whether this registration owns the generation.
    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner(_))
    }

    /// Wait for the in-flight generation's outcome, bounded by `timeout`.
    ///
    /// Returns `None` if the channel closed without a result (the owner
    /// was cancelled), or if the timeout elapsed - callers fall back to
    /// re-checking the thumbnail file on disk. Consuming an `Owner` this
    /// way abandons the registration and returns `None`.
    pub async fn wait_for_outcome(self, timeout: Duration) -> Option<GenerationOutcome> {
        match self {
            Self::Owner(_) => None,
            Self::Waiter(mut rx) => tokio::time::timeout(timeout, rx.recv())
                .await
                .ok()
                .and_then(|recv| recv.ok()),
        }
    }
}

impl InflightRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inflight: DashMap::new(),
            owners: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
        }
    }

    /// Register a request for the given key.
    ///
    /// The entry API makes check-and-insert atomic relative to other
    /// callers registering the same key.
    pub fn register(&self, key: &CacheKey) -> Registration<'_> {
        match self.inflight.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                let rx = entry.get().subscribe();
                self.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "coalescing request onto in-flight generation");
                Registration::Waiter(rx)
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                // Capacity 16: typical fan-in is a handful of waiters per key.
                let (tx, _rx) = broadcast::channel(16);
                entry.insert(tx);
                self.owners.fetch_add(1, Ordering::Relaxed);
                Registration::Owner(OwnerGuard {
                    registry: self,
                    key: key.clone(),
                    completed: false,
                })
            }
        }
    }

    /// Number of generations currently in flight.
    pub fn len(&self) -> usize {
        self.inflight.len()
    }

    /// Whether no generation is currently in flight.
    pub fn is_empty(&self) -> bool {
        self.inflight.is_empty()
    }

    /// Total requests that owned a generation.
    pub fn owner_count(&self) -> u64 {
        self.owners.load(Ordering::Relaxed)
    }

    /// Total requests that waited on another caller's generation.
    pub fn coalesced_count(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }
}

impl Default for InflightRegistry {
    fn default() -> Self {
        Self::new()
    }
}
