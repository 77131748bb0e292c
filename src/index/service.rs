//! Mutation API and query entry points.

use super::cache::EmbeddingCache;
use super::ranker;
use crate::embedding::Embedder;
use crate::models::{EmbeddingEntry, NoteId, SearchHit, SearchOptions, note_text};
use crate::storage::EmbeddingStore;
use crate::{Error, Result};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::instrument;

/// Outcome of a startup backfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InitReport {
    /// Embeddings encoded and persisted during this run.
    pub computed: usize,
    /// Entries in the cache after loading.
    pub total: usize,
}

/// Point-in-time index statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStatus {
    /// Storage backend name.
    pub backend: &'static str,
    /// Entries in the in-memory cache.
    pub cached: usize,
    /// Rows in the embedding table.
    pub persisted: usize,
    /// Configured vector dimension.
    pub dimensions: usize,
    /// Default relevance threshold.
    pub threshold: f32,
    /// Default result cap.
    pub max_results: usize,
}

/// The embedding index: cache, store and encoder behind one API.
///
/// Queries never block on mutations; they rank a cache snapshot. Mutations
/// persist first and touch the cache only once the store call succeeded.
pub struct NoteIndex {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn EmbeddingStore>,
    cache: EmbeddingCache,
    options: SearchOptions,
    mutations: Mutex<()>,
}

impl NoteIndex {
    /// Creates an index with an empty cache.
    ///
    /// Call [`initialize`](Self::initialize) before serving queries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the encoder reports zero dimensions
    /// or the threshold is not finite.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn EmbeddingStore>,
        options: SearchOptions,
    ) -> Result<Self> {
        if embedder.dimensions() == 0 {
            return Err(Error::InvalidInput(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }
        validate_options(&options)?;

        Ok(Self {
            embedder,
            store,
            cache: EmbeddingCache::new(),
            options,
            mutations: Mutex::new(()),
        })
    }

    /// Creates an index whose encoder must produce `dimensions`-long vectors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the encoder's output length differs
    /// from `dimensions`, or for any reason [`new`](Self::new) rejects.
    pub fn with_dimensions(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn EmbeddingStore>,
        options: SearchOptions,
        dimensions: usize,
    ) -> Result<Self> {
        let actual = embedder.dimensions();
        if actual != dimensions {
            return Err(Error::InvalidInput(format!(
                "Configured dimensions {dimensions} do not match the encoder's {actual}"
            )));
        }
        Self::new(embedder, store, options)
    }

    /// Returns the configured vector dimension.
    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    /// Returns the default search options.
    pub const fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Returns the in-memory cache.
    pub const fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    /// Backfills missing embeddings and loads every persisted one.
    ///
    /// Notes without an embedding are encoded and persisted first. The cache
    /// is then replaced with one entry per non-deleted note, in store scan
    /// order. Persisted vectors of the wrong length, or that could not be
    /// decoded, are re-encoded.
    ///
    /// # Errors
    ///
    /// Returns an error if a scan, an encode or a write fails. The cache is
    /// left untouched in that case.
    #[instrument(skip(self), fields(backend = self.store.name()))]
    pub fn initialize(&self) -> Result<InitReport> {
        let _guard = self.lock_mutations();
        self.load()
    }

    /// Drops every persisted embedding and recomputes all of them.
    ///
    /// # Errors
    ///
    /// Returns an error if clearing the store or the following load fails.
    #[instrument(skip(self), fields(backend = self.store.name()))]
    pub fn reindex(&self) -> Result<InitReport> {
        let _guard = self.lock_mutations();
        self.store.clear_embeddings()?;
        self.cache.clear();
        tracing::info!("Cleared persisted embeddings");
        self.load()
    }

    fn load(&self) -> Result<InitReport> {
        let start = Instant::now();
        let dimensions = self.dimensions();
        let mut computed = 0;

        for note in self.store.notes_missing_embeddings()? {
            let vector = self.encode(&note.embedding_text())?;
            self.store.upsert_embedding(note.id, &vector)?;
            computed += 1;
        }

        let mut entries = Vec::new();
        for stored in self.store.notes_with_embeddings()? {
            let id = stored.note.id;
            let vector = match stored.embedding {
                Some(vector) if vector.len() == dimensions => vector,
                Some(stale) => {
                    tracing::warn!(
                        note_id = %id,
                        stored = stale.len(),
                        expected = dimensions,
                        "Re-encoding embedding with stale dimension"
                    );
                    computed += 1;
                    self.encode_and_persist(id, &stored.note.embedding_text())?
                },
                None => {
                    computed += 1;
                    self.encode_and_persist(id, &stored.note.embedding_text())?
                },
            };
            entries.push(EmbeddingEntry::new(id, vector));
        }

        let total = entries.len();
        self.cache.reset(entries);

        metrics::counter!("semnote_embeddings_computed_total").increment(computed as u64);
        tracing::info!(
            computed,
            total,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Initialized embeddings"
        );
        Ok(InitReport { computed, total })
    }

    /// Ranks the cache against a query vector with the default options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the vector length differs from the
    /// configured dimension.
    pub fn search(&self, query: &[f32]) -> Result<Vec<SearchHit>> {
        self.search_with(query, &self.options)
    }

    /// Ranks the cache against a query vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] on a dimension mismatch or a
    /// non-finite threshold.
    pub fn search_with(&self, query: &[f32], options: &SearchOptions) -> Result<Vec<SearchHit>> {
        self.check_dimensions(query.len())?;
        validate_options(options)?;

        let start = Instant::now();
        let snapshot = self.cache.snapshot();
        let hits = ranker::rank(query, &snapshot, options);

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        metrics::counter!("semnote_searches_total").increment(1);
        metrics::histogram!("semnote_search_duration_ms").record(elapsed_ms);
        tracing::debug!(
            hits = hits.len(),
            scanned = snapshot.len(),
            elapsed_ms,
            "Ranked cache"
        );
        Ok(hits)
    }

    /// Encodes `query` and ranks the cache with the default options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty query, or the encoder's
    /// error.
    pub fn search_text(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.search_text_with(query, &self.options)
    }

    /// Encodes `query` and ranks the cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty query, or the encoder's
    /// error.
    pub fn search_text_with(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(Error::InvalidInput("Search query must not be empty".to_string()));
        }
        let vector = self.encode(query)?;
        self.search_with(&vector, options)
    }

    /// Computes, persists and caches the embedding of a new note.
    ///
    /// Adding an id that is already cached replaces its entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an invalid id or empty fields, or
    /// the encoder/store error. Nothing is cached on failure.
    #[instrument(skip_all, fields(note_id = %id))]
    pub fn add(&self, id: NoteId, title: &str, content: &str) -> Result<()> {
        validate_note(id, title, content)?;
        let _guard = self.lock_mutations();

        let vector = self.encode_and_persist(id, &note_text(title, content))?;
        if self.cache.contains(id) {
            tracing::warn!(note_id = %id, "Note already indexed, replacing cached embedding");
            self.cache.replace(id, vector);
        } else {
            self.cache.insert(id, vector);
        }

        record_mutation("add");
        tracing::info!(note_id = %id, "Embedding added");
        Ok(())
    }

    /// Recomputes the embedding of an edited note.
    ///
    /// Works whether or not the note was previously indexed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an invalid id or empty fields, or
    /// the encoder/store error. A failure after the old row was deleted
    /// leaves the note without an embedding until the next
    /// [`initialize`](Self::initialize).
    #[instrument(skip_all, fields(note_id = %id))]
    pub fn update(&self, id: NoteId, title: &str, content: &str) -> Result<()> {
        validate_note(id, title, content)?;
        let _guard = self.lock_mutations();

        self.store.delete_embedding(id)?;
        self.cache.remove(id);

        let vector = self.encode_and_persist(id, &note_text(title, content))?;
        self.cache.insert(id, vector);

        record_mutation("update");
        tracing::info!(note_id = %id, "Embedding updated");
        Ok(())
    }

    /// Drops a note's embedding from the store and the cache.
    ///
    /// Returns `true` if anything was removed. Removing an unknown id is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an invalid id, or the store error.
    #[instrument(skip_all, fields(note_id = %id))]
    pub fn remove(&self, id: NoteId) -> Result<bool> {
        validate_id(id)?;
        let _guard = self.lock_mutations();

        let persisted = self.store.delete_embedding(id)?;
        let cached = self.cache.remove(id);

        record_mutation("remove");
        tracing::info!(note_id = %id, persisted, cached, "Embedding removed");
        Ok(persisted || cached > 0)
    }

    /// Returns cache and store statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the store count fails.
    pub fn status(&self) -> Result<IndexStatus> {
        Ok(IndexStatus {
            backend: self.store.name(),
            cached: self.cache.len(),
            persisted: self.store.embedding_count()?,
            dimensions: self.dimensions(),
            threshold: self.options.threshold,
            max_results: self.options.max_results,
        })
    }

    fn lock_mutations(&self) -> MutexGuard<'_, ()> {
        self.mutations.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Mutation lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.embedder.embed(text)?;
        self.check_dimensions(vector.len())?;
        Ok(vector)
    }

    fn encode_and_persist(&self, id: NoteId, text: &str) -> Result<Vec<f32>> {
        let vector = self.encode(text)?;
        self.store.upsert_embedding(id, &vector)?;
        Ok(vector)
    }

    fn check_dimensions(&self, actual: usize) -> Result<()> {
        let expected = self.dimensions();
        if actual != expected {
            return Err(Error::InvalidInput(format!(
                "Embedding dimension mismatch: expected {expected}, got {actual}"
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for NoteIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteIndex")
            .field("backend", &self.store.name())
            .field("dimensions", &self.embedder.dimensions())
            .field("cached", &self.cache.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn validate_options(options: &SearchOptions) -> Result<()> {
    if !options.threshold.is_finite() {
        return Err(Error::InvalidInput(format!(
            "Similarity threshold must be finite, got {}",
            options.threshold
        )));
    }
    Ok(())
}

fn validate_id(id: NoteId) -> Result<()> {
    if !id.is_valid() {
        return Err(Error::InvalidInput(format!("Invalid note id: {id}")));
    }
    Ok(())
}

fn validate_note(id: NoteId, title: &str, content: &str) -> Result<()> {
    validate_id(id)?;
    if title.is_empty() || content.is_empty() {
        return Err(Error::InvalidInput(
            "Note title and content must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn record_mutation(operation: &'static str) {
    metrics::counter!("semnote_mutations_total", "operation" => operation).increment(1);
}
