//! Integration tests for the embedding index over real stores.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use common::ConceptEmbedder;
use semnote::storage::{InMemoryEmbeddingStore, SqliteEmbeddingStore};
use semnote::{EmbeddingStore, NoteId, NoteIndex, SearchHit, SearchOptions};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use test_case::test_case;

fn open_sqlite(path: &Path) -> Arc<SqliteEmbeddingStore> {
    Arc::new(SqliteEmbeddingStore::new(path).expect("open sqlite store"))
}

fn index_over(store: Arc<dyn EmbeddingStore>) -> NoteIndex {
    NoteIndex::new(Arc::new(ConceptEmbedder), store, SearchOptions::default())
        .expect("valid index")
}

fn ids(hits: &[SearchHit]) -> Vec<i64> {
    hits.iter().map(|h| h.note_id.get()).collect()
}

/// Seeds the two-note corpus used throughout: shopping (1) and workout (2).
fn seed_corpus(store: &SqliteEmbeddingStore) -> (NoteId, NoteId) {
    let shopping = store
        .insert_note("Shopping", "buy milk and eggs")
        .expect("insert note");
    let workout = store
        .insert_note("Workout", "leg day at gym")
        .expect("insert note");
    (shopping, workout)
}

#[test]
fn test_grocery_query_returns_only_shopping_note() {
    let dir = TempDir::new().expect("temp dir");
    let store = open_sqlite(&dir.path().join("notes.sqlite"));
    let (shopping, workout) = seed_corpus(&store);
    let index = index_over(store);
    index.initialize().expect("initialize");

    let hits = index.search_text("grocery list").expect("search");
    assert_eq!(ids(&hits), vec![shopping.get()]);
    assert!(hits[0].similarity >= 0.45);

    let everything = SearchOptions::default().with_threshold(-1.0);
    let hits = index
        .search_text_with("grocery list", &everything)
        .expect("search");
    assert_eq!(ids(&hits), vec![shopping.get(), workout.get()]);
    assert!(hits[0].similarity > hits[1].similarity);
}

#[test]
fn test_backfill_persists_across_restarts() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("notes.sqlite");

    {
        let store = open_sqlite(&path);
        seed_corpus(&store);
        let report = index_over(store).initialize().expect("initialize");
        assert_eq!((report.computed, report.total), (2, 2));
    }

    let store = open_sqlite(&path);
    assert_eq!(store.embedding_count().expect("count"), 2);
    let index = index_over(store);
    let report = index.initialize().expect("initialize again");
    assert_eq!((report.computed, report.total), (0, 2));
    assert_eq!(index.cache().len(), 2);
}

#[test]
fn test_soft_deleted_notes_are_neither_backfilled_nor_loaded() {
    let dir = TempDir::new().expect("temp dir");
    let store = open_sqlite(&dir.path().join("notes.sqlite"));
    let (shopping, workout) = seed_corpus(&store);
    assert!(store.soft_delete_note(workout).expect("soft delete"));

    let index = index_over(Arc::clone(&store) as Arc<dyn EmbeddingStore>);
    let report = index.initialize().expect("initialize");

    assert_eq!((report.computed, report.total), (1, 1));
    assert!(store.get_embedding(workout).expect("get").is_none());
    assert!(index.cache().contains(shopping));
    assert!(!index.cache().contains(workout));
}

#[test]
fn test_stale_dimension_is_reencoded_on_startup() {
    let dir = TempDir::new().expect("temp dir");
    let store = open_sqlite(&dir.path().join("notes.sqlite"));
    let (shopping, _) = seed_corpus(&store);
    store
        .upsert_embedding(shopping, &[0.5, 0.5])
        .expect("seed stale vector");

    let index = index_over(Arc::clone(&store) as Arc<dyn EmbeddingStore>);
    let report = index.initialize().expect("initialize");

    assert_eq!(report.computed, 2);
    let vector = store.get_embedding(shopping).expect("get").expect("present");
    assert_eq!(vector.len(), ConceptEmbedder::DIMENSIONS);
}

#[test]
fn test_corrupt_blob_is_reencoded_on_startup() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("notes.sqlite");
    let store = open_sqlite(&path);
    let (shopping, workout) = seed_corpus(&store);
    store
        .upsert_embedding(workout, &[0.0, 1.0, 0.0, 0.0])
        .expect("seed healthy vector");

    let raw = rusqlite::Connection::open(&path).expect("raw connection");
    raw.execute(
        "INSERT OR REPLACE INTO note_embeddings (note_id, embedding) VALUES (?1, ?2)",
        rusqlite::params![shopping.get(), vec![1u8, 2, 3, 4, 5]],
    )
    .expect("seed corrupt blob");
    drop(raw);

    assert!(matches!(
        store.get_embedding(shopping),
        Err(semnote::Error::OperationFailed { .. })
    ));

    let index = index_over(Arc::clone(&store) as Arc<dyn EmbeddingStore>);
    let report = index.initialize().expect("initialize");
    assert_eq!((report.computed, report.total), (1, 2));

    let vector = store.get_embedding(shopping).expect("get").expect("present");
    assert_eq!(vector.len(), ConceptEmbedder::DIMENSIONS);

    let hits = index.search_text("grocery list").expect("search");
    assert_eq!(ids(&hits), vec![shopping.get()]);
    let hits = index.search_text("leg day at gym").expect("search");
    assert_eq!(ids(&hits), vec![workout.get()]);
}

#[test]
fn test_add_then_search_identical_text() {
    let store = Arc::new(InMemoryEmbeddingStore::new());
    let index = index_over(Arc::clone(&store) as Arc<dyn EmbeddingStore>);
    let id = NoteId::new(42);

    index.add(id, "Trip", "book flight and hotel").expect("add");

    let hits = index.search_text("Trip: book flight and hotel").expect("search");
    assert_eq!(ids(&hits), vec![42]);
    assert!((hits[0].similarity - 1.0).abs() < 1e-5);
    assert!(store.get_embedding(id).expect("get").is_some());
}

#[test]
fn test_add_twice_leaves_one_entry_and_one_row() {
    let store = Arc::new(InMemoryEmbeddingStore::new());
    let index = index_over(Arc::clone(&store) as Arc<dyn EmbeddingStore>);
    let id = NoteId::new(7);

    index.add(id, "Shopping", "milk").expect("add");
    index.add(id, "Shopping", "milk").expect("add again");

    assert_eq!(index.cache().count_for(id), 1);
    assert_eq!(store.embedding_count().expect("count"), 1);
    assert_eq!(ids(&index.search_text("milk").expect("search")), vec![7]);
}

#[test]
fn test_update_collapses_stale_duplicates() {
    let store = Arc::new(InMemoryEmbeddingStore::new());
    let index = index_over(Arc::clone(&store) as Arc<dyn EmbeddingStore>);
    let id = NoteId::new(3);

    index.add(id, "Shopping", "milk").expect("add");
    index.cache().insert(id, vec![1.0, 0.0, 0.0, 0.0]);
    index.cache().insert(id, vec![1.0, 0.0, 0.0, 0.0]);
    assert_eq!(index.cache().count_for(id), 3);

    index.update(id, "Workout", "gym").expect("update");

    assert_eq!(index.cache().count_for(id), 1);
    assert!(index.search_text("milk").expect("search").is_empty());
    assert_eq!(ids(&index.search_text("gym").expect("search")), vec![3]);
    let persisted = store.get_embedding(id).expect("get").expect("present");
    assert_eq!(persisted, index.cache().snapshot()[0].vector);
}

#[test]
fn test_remove_drops_note_from_search_and_store() {
    let dir = TempDir::new().expect("temp dir");
    let store = open_sqlite(&dir.path().join("notes.sqlite"));
    let (shopping, _) = seed_corpus(&store);
    let index = index_over(Arc::clone(&store) as Arc<dyn EmbeddingStore>);
    index.initialize().expect("initialize");

    assert!(index.remove(shopping).expect("remove"));

    assert!(index.search_text("grocery list").expect("search").is_empty());
    assert!(store.get_embedding(shopping).expect("get").is_none());
}

#[test]
fn test_reindex_after_restart() {
    let dir = TempDir::new().expect("temp dir");
    let store = open_sqlite(&dir.path().join("notes.sqlite"));
    seed_corpus(&store);
    let index = index_over(Arc::clone(&store) as Arc<dyn EmbeddingStore>);
    index.initialize().expect("initialize");

    let report = index.reindex().expect("reindex");
    assert_eq!((report.computed, report.total), (2, 2));
    assert_eq!(store.embedding_count().expect("count"), 2);
}

#[test_case(0.45, 5, &[1] ; "default options")]
#[test_case(-1.0, 5, &[1, 2, 3] ; "no threshold")]
#[test_case(-1.0, 2, &[1, 2] ; "capped")]
#[test_case(1.01, 5, &[] ; "nothing clears threshold")]
fn test_search_options_table(threshold: f32, max_results: usize, expected: &[i64]) {
    let store = Arc::new(InMemoryEmbeddingStore::new());
    let index = index_over(store);
    index.add(NoteId::new(1), "Shopping", "buy milk").expect("add");
    index.add(NoteId::new(2), "Workout", "leg day").expect("add");
    index.add(NoteId::new(3), "Travel", "passport").expect("add");

    let options = SearchOptions::new()
        .with_threshold(threshold)
        .with_max_results(max_results);
    let hits = index.search_text_with("grocery", &options).expect("search");
    assert_eq!(ids(&hits), expected);
}

#[test]
fn test_concurrent_searches_during_mutations() {
    let index = Arc::new(index_over(Arc::new(InMemoryEmbeddingStore::new())));
    index.add(NoteId::new(1), "Shopping", "milk eggs").expect("add");

    let writer = {
        let index = Arc::clone(&index);
        std::thread::spawn(move || {
            for raw in 2..100 {
                let id = NoteId::new(raw);
                index.add(id, "Workout", "gym").expect("add");
                index.update(id, "Workout", "leg day").expect("update");
                if raw % 2 == 0 {
                    index.remove(id).expect("remove");
                }
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let index = Arc::clone(&index);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    let hits = index.search_text("grocery").expect("search");
                    assert_eq!(ids(&hits), vec![1]);
                }
            })
        })
        .collect();

    writer.join().expect("writer panicked");
    for reader in readers {
        reader.join().expect("reader panicked");
    }
    assert_eq!(index.cache().len(), 1 + 49);
}
