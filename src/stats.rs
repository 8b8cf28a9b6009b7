use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Runtime metrics for a stream.
///
/// A lightweight, read-only view over counters maintained by the stream.
/// Obtain a `Stats` handle via `Writer::stats()`. Values use relaxed
/// atomics and are intended for diagnostics.
#[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
#[derive(Debug, Clone)]
pub struct Stats {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    active_readers: AtomicU64,
    written: AtomicU64,
    discarded: AtomicU64,
    retained: AtomicU64,
}

impl Stats {
    // Create a new, empty stats instance.
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Counters::default()),
        }
    }

    pub(crate) fn record_attach(&self) {
        self.inner.active_readers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_detach(&self) {
        self.inner.active_readers.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self) {
        self.inner.written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discard(&self, count: u64) {
        self.inner.discarded.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn set_retained(&self, count: u64) {
        self.inner.retained.store(count, Ordering::Relaxed);
    }

    /// Returns the number of readers currently attached.
    pub fn active_readers(&self) -> u64 {
        self.inner.active_readers.load(Ordering::Relaxed)
    }

    /// Returns the number of items ever written.
    pub fn written(&self) -> u64 {
        self.inner.written.load(Ordering::Relaxed)
    }

    /// Returns the number of items reclaimed by compaction.
    pub fn discarded(&self) -> u64 {
        self.inner.discarded.load(Ordering::Relaxed)
    }

    /// Returns the number of items physically buffered after the last mutation.
    pub fn retained(&self) -> u64 {
        self.inner.retained.load(Ordering::Relaxed)
    }
}
