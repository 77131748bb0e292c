//! In-memory embedding cache.

use crate::models::{EmbeddingEntry, NoteId};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A point-in-time view of the cache, cheap to clone and safe to scan while
/// the cache is being mutated.
pub type CacheSnapshot = Arc<Vec<EmbeddingEntry>>;

/// Process-wide set of `(note_id, vector)` pairs.
///
/// Readers clone the current [`CacheSnapshot`]; writers mutate a private copy
/// (only when a snapshot is still held elsewhere) and publish it under the
/// write lock. An in-flight search therefore always scans a consistent set,
/// either the one before a mutation or the one after it.
///
/// Entry order is insertion order. The cache does not enforce one entry per
/// note: [`insert`](Self::insert) appends unconditionally and callers are
/// expected to check [`contains`](Self::contains) first.
#[derive(Debug, Default)]
pub struct EmbeddingCache {
    entries: RwLock<CacheSnapshot>,
}

impl EmbeddingCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache holding `entries` in the given order.
    #[must_use]
    pub fn from_entries(entries: Vec<EmbeddingEntry>) -> Self {
        Self {
            entries: RwLock::new(Arc::new(entries)),
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> CacheSnapshot {
        Arc::clone(&self.read())
    }

    /// Appends an entry without checking for an existing one.
    pub fn insert(&self, note_id: NoteId, vector: Vec<f32>) {
        self.mutate(|entries| entries.push(EmbeddingEntry::new(note_id, vector)));
    }

    /// Removes every entry for `note_id`, then appends the new one.
    ///
    /// Returns the number of entries removed.
    pub fn replace(&self, note_id: NoteId, vector: Vec<f32>) -> usize {
        self.mutate(|entries| {
            let removed = remove_all(entries, note_id);
            entries.push(EmbeddingEntry::new(note_id, vector));
            removed
        })
    }

    /// Removes every entry for `note_id`. Returns the number removed.
    pub fn remove(&self, note_id: NoteId) -> usize {
        if !self.contains(note_id) {
            return 0;
        }
        self.mutate(|entries| remove_all(entries, note_id))
    }

    /// Replaces the whole contents, e.g. after a bulk load.
    pub fn reset(&self, entries: Vec<EmbeddingEntry>) {
        let len = entries.len();
        *self.write() = Arc::new(entries);
        record_size(len);
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.reset(Vec::new());
    }

    /// Returns true if at least one entry exists for `note_id`.
    pub fn contains(&self, note_id: NoteId) -> bool {
        self.read().iter().any(|entry| entry.note_id == note_id)
    }

    /// Returns the number of entries for `note_id`.
    pub fn count_for(&self, note_id: NoteId) -> usize {
        self.read()
            .iter()
            .filter(|entry| entry.note_id == note_id)
            .count()
    }

    /// Returns the total number of entries.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Vec<EmbeddingEntry>) -> R) -> R {
        let mut guard = self.write();
        let entries = Arc::make_mut(&mut guard);
        let result = f(entries);
        record_size(entries.len());
        result
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheSnapshot> {
        self.entries.read().unwrap_or_else(|poisoned| {
            tracing::warn!("Embedding cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheSnapshot> {
        self.entries.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Embedding cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

fn remove_all(entries: &mut Vec<EmbeddingEntry>, note_id: NoteId) -> usize {
    let before = entries.len();
    entries.retain(|entry| entry.note_id != note_id);
    before - entries.len()
}

#[allow(clippy::cast_precision_loss)]
fn record_size(len: usize) {
    metrics::gauge!("semnote_cache_entries").set(len as f64);
}
