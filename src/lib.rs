//! # Semnote
//!
//! A disk-backed embedding cache and semantic search engine for notes.
//!
//! Semnote keeps one embedding vector per note in memory, persists every
//! vector to the note database, backfills notes that have none, and answers
//! top-k cosine similarity queries with a relevance cutoff.
//!
//! ## Layers
//!
//! - [`storage`]: persisted note embeddings (`SQLite` or in-memory)
//! - [`embedding`]: text to fixed-dimension vector encoders
//! - [`index`]: the embedding cache, the ranker and the mutation API
//! - [`api`]: boundary request/response shapes shared by the CLI and HTTP
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use semnote::{NoteIndex, SemnoteConfig};
//! use semnote::embedding::FastEmbedEmbedder;
//! use semnote::storage::SqliteEmbeddingStore;
//!
//! let config = SemnoteConfig::default();
//! let store = Arc::new(SqliteEmbeddingStore::new(&config.db_path)?);
//! let embedder = Arc::new(FastEmbedEmbedder::with_dimensions(config.dimensions));
//! let index = NoteIndex::new(embedder, store, config.search_options())?;
//! index.initialize()?;
//! let hits = index.search_text("grocery list")?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod api;
pub mod config;
pub mod embedding;
#[cfg(feature = "http")]
pub mod http;
pub mod index;
pub mod models;
pub mod observability;
pub mod storage;

// Re-exports for convenience
pub use config::SemnoteConfig;
pub use embedding::Embedder;
pub use index::{EmbeddingCache, IndexStatus, InitReport, NoteIndex};
pub use models::{EmbeddingEntry, NoteId, NoteRecord, SearchHit, SearchOptions};
pub use storage::EmbeddingStore;

/// Error type for semnote operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Empty query, missing note fields, dimension mismatch |
/// | `OperationFailed` | Database, encoder, I/O, configuration or blob decoding failures |
/// | `FeatureNotEnabled` | Using features requiring compile-time flags |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A search query is empty or whitespace-only
    /// - `note_id`, `title` or `content` is missing from a mutation
    /// - A vector does not match the configured dimension
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` statements fail or the database cannot be opened
    /// - The embedding model cannot be loaded or panics
    /// - A persisted embedding blob cannot be decoded
    /// - Configuration files cannot be read or parsed
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Feature not enabled (requires feature flag).
    #[error("feature not enabled: {0} (compile with --features {0})")]
    FeatureNotEnabled(String),
}

impl Error {
    /// Builds an [`Error::OperationFailed`] from an operation tag and any displayable cause.
    pub fn operation(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Returns true for caller mistakes that should map to a 400-style response.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

/// Result type alias for semnote operations.
pub type Result<T> = std::result::Result<T, Error>;
