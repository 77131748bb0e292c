//! Storage layer.
//!
//! The index persists one embedding per note through an [`EmbeddingStore`].
//! The note table itself belongs to the note service; stores only read it.

// Allow significant_drop_tightening - releasing the connection lock a few
// statements early provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]

pub mod blob;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use memory::InMemoryEmbeddingStore;
pub use sqlite::SqliteEmbeddingStore;
pub use traits::EmbeddingStore;
