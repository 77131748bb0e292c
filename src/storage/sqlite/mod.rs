//! `SQLite` embedding store.
//!
//! The note database is shared with the note service, which owns the `notes`
//! table. This module only adds the `note_embeddings` table and reads notes.
//!
//! ## Module Structure
//!
//! - [`connection`]: Connection handling (`Mutex<Connection>`, lock acquisition, pragmas)
//! - [`metrics`]: Storage operation metrics
//! - `store`: The [`SqliteEmbeddingStore`] backend

mod connection;
mod metrics;
mod store;

pub use connection::{acquire_lock, configure_connection};
pub use metrics::record_operation_metrics;
pub use store::SqliteEmbeddingStore;
