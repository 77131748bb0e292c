//! `SQLite`-based embedding store.

use super::connection::{acquire_lock, configure_connection};
use super::metrics::observe;
use crate::models::{NoteId, NoteRecord, StoredNote};
use crate::storage::blob::{decode_embedding, encode_embedding};
use crate::storage::traits::EmbeddingStore;
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::instrument;

const BACKEND: &str = "sqlite";

/// `SQLite`-based embedding store.
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` for thread-safe access. WAL mode and the
/// `busy_timeout` pragma let the note service write to the same file while
/// the index reads it.
///
/// # Schema
///
/// - `notes`: owned by the note service; created here only if absent so a
///   fresh database is usable. Soft-deleted rows carry `deleted_at`.
/// - `note_embeddings`: one row per note, `embedding` is a little-endian
///   `f32` blob.
pub struct SqliteEmbeddingStore {
    /// Connection to the `SQLite` database.
    ///
    /// Protected by Mutex because `rusqlite::Connection` is not `Sync`.
    conn: Mutex<Connection>,
    /// Path to the `SQLite` database (None for in-memory).
    db_path: Option<PathBuf>,
}

impl SqliteEmbeddingStore {
    /// Opens (or creates) the note database at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::operation("create_db_dir", e))?;
        }

        let conn = Connection::open(&db_path).map_err(|e| Error::operation("open_sqlite", e))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Creates an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::operation("open_sqlite_in_memory", e))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        configure_connection(&conn)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL DEFAULT (strftime('%s','now')),
                updated_at INTEGER NOT NULL DEFAULT (strftime('%s','now')),
                deleted_at INTEGER NULL
            );
            CREATE TABLE IF NOT EXISTS note_embeddings (
                note_id INTEGER PRIMARY KEY,
                embedding BLOB NOT NULL
            );",
        )
        .map_err(|e| Error::operation("create_schema", e))?;

        Ok(())
    }

    /// Inserts a note row and returns its id.
    ///
    /// Notes belong to the note service; this exists to seed fixtures and
    /// local databases.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert_note(&self, title: &str, content: &str) -> Result<NoteId> {
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "INSERT INTO notes (title, content) VALUES (?1, ?2)",
            params![title, content],
        )
        .map_err(|e| Error::operation("insert_note", e))?;
        Ok(NoteId::new(conn.last_insert_rowid()))
    }

    /// Marks a note as deleted the way the note service does.
    ///
    /// Returns `true` if a live note was marked.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn soft_delete_note(&self, id: NoteId) -> Result<bool> {
        let conn = acquire_lock(&self.conn);
        let changed = conn
            .execute(
                "UPDATE notes SET deleted_at = strftime('%s','now')
                 WHERE id = ?1 AND deleted_at IS NULL",
                params![id.get()],
            )
            .map_err(|e| Error::operation("soft_delete_note", e))?;
        Ok(changed > 0)
    }
}

impl EmbeddingStore for SqliteEmbeddingStore {
    fn name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self))]
    fn notes_missing_embeddings(&self) -> Result<Vec<NoteRecord>> {
        let start = Instant::now();
        let result = (|| -> Result<Vec<NoteRecord>> {
            let conn = acquire_lock(&self.conn);
            let mut stmt = conn
                .prepare(
                    "SELECT id, title, content
                     FROM notes
                     WHERE id NOT IN (SELECT note_id FROM note_embeddings)
                       AND deleted_at IS NULL
                     ORDER BY id",
                )
                .map_err(|e| Error::operation("notes_missing_embeddings", e))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(NoteRecord::new(
                        NoteId::new(row.get(0)?),
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(|e| Error::operation("notes_missing_embeddings", e))?;

            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| Error::operation("notes_missing_embeddings", e))
        })();
        observe(BACKEND, "notes_missing_embeddings", start, result)
    }

    #[instrument(skip(self))]
    fn notes_with_embeddings(&self) -> Result<Vec<StoredNote>> {
        let start = Instant::now();
        let result = (|| -> Result<Vec<StoredNote>> {
            let conn = acquire_lock(&self.conn);
            let mut stmt = conn
                .prepare(
                    "SELECT n.id, n.title, n.content, e.embedding
                     FROM notes n
                     LEFT JOIN note_embeddings e ON n.id = e.note_id
                     WHERE n.deleted_at IS NULL
                     ORDER BY n.id",
                )
                .map_err(|e| Error::operation("notes_with_embeddings", e))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        NoteRecord::new(
                            NoteId::new(row.get(0)?),
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ),
                        row.get::<_, Option<Vec<u8>>>(3)?,
                    ))
                })
                .map_err(|e| Error::operation("notes_with_embeddings", e))?;

            let mut notes = Vec::new();
            for row in rows {
                let (note, blob) = row.map_err(|e| Error::operation("notes_with_embeddings", e))?;
                let embedding = match blob.as_deref().map(decode_embedding).transpose() {
                    Ok(embedding) => embedding,
                    Err(e) => {
                        tracing::warn!(
                            note_id = %note.id,
                            error = %e,
                            "Treating undecodable embedding as missing"
                        );
                        None
                    },
                };
                notes.push(StoredNote { note, embedding });
            }
            Ok(notes)
        })();
        observe(BACKEND, "notes_with_embeddings", start, result)
    }

    #[instrument(skip(self, embedding), fields(dimensions = embedding.len()))]
    fn upsert_embedding(&self, id: NoteId, embedding: &[f32]) -> Result<()> {
        let start = Instant::now();
        let result = {
            let conn = acquire_lock(&self.conn);
            conn.execute(
                "INSERT OR REPLACE INTO note_embeddings (note_id, embedding) VALUES (?1, ?2)",
                params![id.get(), encode_embedding(embedding)],
            )
            .map(|_| ())
            .map_err(|e| Error::operation("upsert_embedding", e))
        };
        observe(BACKEND, "upsert_embedding", start, result)
    }

    #[instrument(skip(self))]
    fn delete_embedding(&self, id: NoteId) -> Result<bool> {
        let start = Instant::now();
        let result = {
            let conn = acquire_lock(&self.conn);
            conn.execute(
                "DELETE FROM note_embeddings WHERE note_id = ?1",
                params![id.get()],
            )
            .map(|changed| changed > 0)
            .map_err(|e| Error::operation("delete_embedding", e))
        };
        observe(BACKEND, "delete_embedding", start, result)
    }

    fn get_embedding(&self, id: NoteId) -> Result<Option<Vec<f32>>> {
        let start = Instant::now();
        let result = (|| -> Result<Option<Vec<f32>>> {
            let conn = acquire_lock(&self.conn);
            let blob: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT embedding FROM note_embeddings WHERE note_id = ?1",
                    params![id.get()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| Error::operation("get_embedding", e))?;
            blob.as_deref().map(decode_embedding).transpose()
        })();
        observe(BACKEND, "get_embedding", start, result)
    }

    fn embedding_count(&self) -> Result<usize> {
        let conn = acquire_lock(&self.conn);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM note_embeddings", [], |row| row.get(0))
            .map_err(|e| Error::operation("embedding_count", e))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    #[instrument(skip(self))]
    fn clear_embeddings(&self) -> Result<()> {
        let start = Instant::now();
        let result = {
            let conn = acquire_lock(&self.conn);
            conn.execute("DELETE FROM note_embeddings", [])
                .map(|_| ())
                .map_err(|e| Error::operation("clear_embeddings", e))
        };
        observe(BACKEND, "clear_embeddings", start, result)
    }
}
