//! Search options and results.

use super::NoteId;
use serde::Serialize;

/// Default minimum cosine similarity for a hit.
///
/// Chosen by hand on a small corpus; exposed through configuration.
pub const DEFAULT_THRESHOLD: f32 = 0.45;

/// Default maximum number of hits returned by a search.
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Ranking parameters for a search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Minimum similarity score a hit must reach (inclusive).
    pub threshold: f32,
    /// Maximum number of hits returned.
    pub max_results: usize,
}

impl SearchOptions {
    /// Creates options with the default threshold and result cap.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Sets the minimum similarity threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the maximum number of results.
    #[must_use]
    pub const fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// A ranked search hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchHit {
    /// The matching note.
    pub note_id: NoteId,
    /// Cosine similarity between the query and the note.
    pub similarity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_options_defaults() {
        let options = SearchOptions::default();
        assert!((options.threshold - 0.45).abs() < f32::EPSILON);
        assert_eq!(options.max_results, 5);
    }

    #[test]
    fn test_search_options_builders() {
        let options = SearchOptions::new().with_threshold(0.2).with_max_results(10);
        assert!((options.threshold - 0.2).abs() < f32::EPSILON);
        assert_eq!(options.max_results, 10);
    }

    #[test]
    fn test_search_hit_serializes_boundary_shape() {
        let hit = SearchHit {
            note_id: NoteId::new(3),
            similarity: 0.5,
        };
        let value = serde_json::to_value(hit).unwrap_or_default();
        assert_eq!(value["note_id"], 3);
        assert_eq!(value["similarity"], 0.5);
    }
}
