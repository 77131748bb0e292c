//! Note identifiers, records and embedding entries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a note, owned by the note database.
///
/// Notes use `SQLite` integer primary keys, so only positive ids are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(i64);

impl NoteId {
    /// Creates a new note ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Returns true if the id can refer to a stored note.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NoteId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A non-deleted note as read from the note database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    /// Note identifier.
    pub id: NoteId,
    /// Note title.
    pub title: String,
    /// Note body.
    pub content: String,
}

impl NoteRecord {
    /// Creates a note record.
    #[must_use]
    pub fn new(id: impl Into<NoteId>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    /// Returns the text that is embedded for this note.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        note_text(&self.title, &self.content)
    }
}

/// A note joined with its persisted embedding, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredNote {
    /// The note.
    pub note: NoteRecord,
    /// The persisted vector, `None` when the note has not been embedded yet.
    pub embedding: Option<Vec<f32>>,
}

/// One cached `(note_id, vector)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingEntry {
    /// Note the vector belongs to.
    pub note_id: NoteId,
    /// The embedding vector.
    pub vector: Vec<f32>,
}

impl EmbeddingEntry {
    /// Creates a cache entry.
    #[must_use]
    pub const fn new(note_id: NoteId, vector: Vec<f32>) -> Self {
        Self { note_id, vector }
    }
}

/// Builds the text embedded for a note: `"{title}: {content}"`.
#[must_use]
pub fn note_text(title: &str, content: &str) -> String {
    format!("{title}: {content}")
}
