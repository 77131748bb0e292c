//! In-memory embedding store.
//!
//! Mirrors the `SQLite` store's semantics (soft deletes, one embedding per
//! note, ascending id order) without touching disk. Used by tests and
//! benchmarks.

use crate::Result;
use crate::models::{NoteId, NoteRecord, StoredNote};
use crate::storage::sqlite::acquire_lock;
use crate::storage::traits::EmbeddingStore;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    notes: BTreeMap<NoteId, (NoteRecord, bool)>,
    embeddings: BTreeMap<NoteId, Vec<f32>>,
    next_id: i64,
}

/// Embedding store backed by in-process maps.
#[derive(Debug, Default)]
pub struct InMemoryEmbeddingStore {
    state: Mutex<State>,
}

impl InMemoryEmbeddingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a note and returns its id (ids start at 1).
    pub fn insert_note(&self, title: &str, content: &str) -> NoteId {
        let mut state = acquire_lock(&self.state);
        state.next_id += 1;
        let id = NoteId::new(state.next_id);
        state
            .notes
            .insert(id, (NoteRecord::new(id, title, content), false));
        id
    }

    /// Marks a note as deleted. Returns `true` if a live note was marked.
    pub fn soft_delete_note(&self, id: NoteId) -> bool {
        let mut state = acquire_lock(&self.state);
        match state.notes.get_mut(&id) {
            Some((_, deleted)) if !*deleted => {
                *deleted = true;
                true
            },
            _ => false,
        }
    }
}

impl EmbeddingStore for InMemoryEmbeddingStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn notes_missing_embeddings(&self) -> Result<Vec<NoteRecord>> {
        let state = acquire_lock(&self.state);
        Ok(state
            .notes
            .values()
            .filter(|(note, deleted)| !deleted && !state.embeddings.contains_key(&note.id))
            .map(|(note, _)| note.clone())
            .collect())
    }

    fn notes_with_embeddings(&self) -> Result<Vec<StoredNote>> {
        let state = acquire_lock(&self.state);
        Ok(state
            .notes
            .values()
            .filter(|(_, deleted)| !deleted)
            .map(|(note, _)| StoredNote {
                note: note.clone(),
                embedding: state.embeddings.get(&note.id).cloned(),
            })
            .collect())
    }

    fn upsert_embedding(&self, id: NoteId, embedding: &[f32]) -> Result<()> {
        acquire_lock(&self.state)
            .embeddings
            .insert(id, embedding.to_vec());
        Ok(())
    }

    fn delete_embedding(&self, id: NoteId) -> Result<bool> {
        Ok(acquire_lock(&self.state).embeddings.remove(&id).is_some())
    }

    fn get_embedding(&self, id: NoteId) -> Result<Option<Vec<f32>>> {
        Ok(acquire_lock(&self.state).embeddings.get(&id).cloned())
    }

    fn embedding_count(&self) -> Result<usize> {
        Ok(acquire_lock(&self.state).embeddings.len())
    }

    fn clear_embeddings(&self) -> Result<()> {
        acquire_lock(&self.state).embeddings.clear();
        Ok(())
    }
}
