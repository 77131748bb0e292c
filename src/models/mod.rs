//! Data models for semnote.
//!
//! This module contains the note, embedding and search types shared by the
//! storage, index and boundary layers.

mod note;
mod search;

pub use note::{EmbeddingEntry, NoteId, NoteRecord, StoredNote, note_text};
pub use search::{DEFAULT_MAX_RESULTS, DEFAULT_THRESHOLD, SearchHit, SearchOptions};
