//! Embedding store trait.
//!
//! The embedding store is the persistence boundary of the index: it reads the
//! note table owned by the note service and reads/writes one embedding per
//! note.
//!
//! # Available Implementations
//!
//! | Backend | Use Case |
//! |---------|----------|
//! | `SqliteEmbeddingStore` | The shared note database (default) |
//! | `InMemoryEmbeddingStore` | Tests and benchmarks |
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use semnote::storage::{EmbeddingStore, SqliteEmbeddingStore};
//! use semnote::NoteId;
//!
//! let store = SqliteEmbeddingStore::new("./notes.sqlite")?;
//! for note in store.notes_missing_embeddings()? {
//!     let vector = embedder.embed(&note.embedding_text())?;
//!     store.upsert_embedding(note.id, &vector)?;
//! }
//! ```

use crate::Result;
use crate::models::{NoteId, NoteRecord, StoredNote};

/// Trait for embedding persistence backends.
///
/// # Implementor Notes
///
/// - Methods use `&self` to enable sharing via `Arc<dyn EmbeddingStore>`
/// - Use interior mutability (e.g., `Mutex<Connection>`) for mutable state
/// - Soft-deleted notes must never be returned by the scan methods
/// - At most one embedding is stored per note id
pub trait EmbeddingStore: Send + Sync {
    /// Returns the backend name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Returns every non-deleted note that has no persisted embedding.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan fails.
    fn notes_missing_embeddings(&self) -> Result<Vec<NoteRecord>>;

    /// Returns every non-deleted note joined with its embedding, if any.
    ///
    /// Notes are returned in ascending id order. A stored embedding that
    /// cannot be decoded is reported as absent so the caller recomputes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan fails.
    fn notes_with_embeddings(&self) -> Result<Vec<StoredNote>>;

    /// Inserts or replaces the embedding for a note.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn upsert_embedding(&self, id: NoteId, embedding: &[f32]) -> Result<()>;

    /// Deletes the embedding for a note.
    ///
    /// Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete_embedding(&self, id: NoteId) -> Result<bool>;

    /// Returns the persisted embedding for a note.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the stored embedding is corrupt.
    fn get_embedding(&self, id: NoteId) -> Result<Option<Vec<f32>>>;

    /// Returns the number of persisted embeddings.
    ///
    /// # Errors
    ///
    /// Returns an error if the count fails.
    fn embedding_count(&self) -> Result<usize>;

    /// Deletes every persisted embedding.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn clear_embeddings(&self) -> Result<()>;
}
