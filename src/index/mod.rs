//! The embedding index.
//!
//! - [`EmbeddingCache`]: in-process `(note_id, vector)` set, the source of truth for queries
//! - [`ranker`]: cosine similarity, threshold filtering and top-k selection
//! - [`NoteIndex`]: startup backfill plus the add/update/remove units of work
//!
//! # Concurrency
//!
//! Searches read an immutable snapshot of the cache; mutations copy-on-write
//! and swap it. Add/update/remove calls are serialised against each other so
//! the store and the cache see mutations in the same order.

mod cache;
pub mod ranker;
mod service;

pub use cache::{CacheSnapshot, EmbeddingCache};
pub use ranker::{cosine_similarity, rank};
pub use service::{IndexStatus, InitReport, NoteIndex};
