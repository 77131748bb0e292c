//! Cosine similarity ranking.
//!
//! Scores a query vector against every cached entry, drops scores below the
//! relevance threshold and keeps the best `max_results`. The sort is stable,
//! so equal scores keep cache order.

use crate::models::{EmbeddingEntry, SearchHit, SearchOptions};

/// Cosine similarity between two vectors.
///
/// Returns `0.0` when either vector has zero magnitude or the lengths
/// differ.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    score(a, norm(a), b)
}

/// Ranks `entries` against `query`.
///
/// Entries scoring below `options.threshold` (and any `NaN` score) are
/// excluded. Hits are ordered by descending similarity; ties keep the order
/// of `entries`. At most `options.max_results` hits are returned.
#[must_use]
pub fn rank(query: &[f32], entries: &[EmbeddingEntry], options: &SearchOptions) -> Vec<SearchHit> {
    if options.max_results == 0 || entries.is_empty() {
        return Vec::new();
    }

    let query_norm = norm(query);
    let mut hits: Vec<SearchHit> = entries
        .iter()
        .filter(|entry| entry.vector.len() == query.len())
        .map(|entry| SearchHit {
            note_id: entry.note_id,
            similarity: score(query, query_norm, &entry.vector),
        })
        .filter(|hit| hit.similarity >= options.threshold)
        .collect();

    hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    hits.truncate(options.max_results);
    hits
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn score(query: &[f32], query_norm: f32, other: &[f32]) -> f32 {
    let other_norm = norm(other);
    if query_norm == 0.0 || other_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = query.iter().zip(other).map(|(x, y)| x * y).sum();
    dot / (query_norm * other_norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteId;
    use test_case::test_case;

    fn entry(id: i64, vector: &[f32]) -> EmbeddingEntry {
        EmbeddingEntry::new(NoteId::new(id), vector.to_vec())
    }

    fn options(threshold: f32, max_results: usize) -> SearchOptions {
        SearchOptions::new()
            .with_threshold(threshold)
            .with_max_results(max_results)
    }

    fn ids(hits: &[SearchHit]) -> Vec<i64> {
        hits.iter().map(|h| h.note_id.get()).collect()
    }

    #[test_case(&[1.0, 0.0], &[1.0, 0.0], 1.0 ; "identical")]
    #[test_case(&[1.0, 0.0], &[0.0, 1.0], 0.0 ; "orthogonal")]
    #[test_case(&[1.0, 0.0], &[-1.0, 0.0], -1.0 ; "opposite")]
    #[test_case(&[1.0, 1.0], &[2.0, 2.0], 1.0 ; "scale invariant")]
    #[test_case(&[0.0, 0.0], &[1.0, 0.0], 0.0 ; "zero query")]
    #[test_case(&[1.0, 0.0], &[0.0, 0.0], 0.0 ; "zero entry")]
    #[test_case(&[1.0, 0.0], &[1.0, 0.0, 0.0], 0.0 ; "length mismatch")]
    fn test_cosine_similarity(a: &[f32], b: &[f32], expected: f32) {
        assert!((cosine_similarity(a, b) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_rank_orders_by_descending_similarity() {
        let entries = [
            entry(1, &[0.0, 1.0]),
            entry(2, &[1.0, 0.0]),
            entry(3, &[1.0, 1.0]),
        ];
        let hits = rank(&[1.0, 0.1], &entries, &options(0.0, 5));
        assert_eq!(ids(&hits), vec![2, 3, 1]);
        assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }

    #[test]
    fn test_rank_applies_threshold_inclusively() {
        let entries = [entry(1, &[1.0, 0.0]), entry(2, &[0.0, 1.0])];
        let hits = rank(&[1.0, 0.0], &entries, &options(1.0, 5));
        assert_eq!(ids(&hits), vec![1]);
    }

    #[test]
    fn test_rank_truncates_to_max_results() {
        let entries: Vec<_> = (1..=10).map(|i| entry(i, &[1.0, 0.0])).collect();
        let hits = rank(&[1.0, 0.0], &entries, &options(0.0, 3));
        assert_eq!(ids(&hits), vec![1, 2, 3]);
    }

    #[test]
    fn test_rank_ties_keep_cache_order() {
        let entries = [
            entry(7, &[2.0, 0.0]),
            entry(3, &[1.0, 0.0]),
            entry(5, &[3.0, 0.0]),
        ];
        let hits = rank(&[1.0, 0.0], &entries, &options(0.5, 5));
        assert_eq!(ids(&hits), vec![7, 3, 5]);
    }

    #[test]
    fn test_rank_zero_max_results() {
        let entries = [entry(1, &[1.0, 0.0])];
        assert!(rank(&[1.0, 0.0], &entries, &options(0.0, 0)).is_empty());
    }

    #[test]
    fn test_rank_empty_cache() {
        assert!(rank(&[1.0, 0.0], &[], &SearchOptions::default()).is_empty());
    }

    #[test]
    fn test_rank_zero_query_scores_nothing_above_positive_threshold() {
        let entries = [entry(1, &[1.0, 0.0])];
        assert!(rank(&[0.0, 0.0], &entries, &options(0.1, 5)).is_empty());
        let hits = rank(&[0.0, 0.0], &entries, &options(0.0, 5));
        assert_eq!(hits.len(), 1);
        assert!(hits[0].similarity.abs() < f32::EPSILON);
    }

    #[test]
    fn test_rank_excludes_nan_scores() {
        let entries = [entry(1, &[f32::NAN, 1.0]), entry(2, &[1.0, 0.0])];
        let hits = rank(&[1.0, 0.0], &entries, &options(-1.0, 5));
        assert_eq!(ids(&hits), vec![2]);
    }

    #[test]
    fn test_rank_skips_mismatched_entries() {
        let entries = [entry(1, &[1.0, 0.0, 0.0]), entry(2, &[1.0, 0.0])];
        let hits = rank(&[1.0, 0.0], &entries, &options(-1.0, 5));
        assert_eq!(ids(&hits), vec![2]);
    }
}
