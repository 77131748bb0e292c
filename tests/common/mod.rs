//! Shared fixtures for integration tests.

#![allow(dead_code)]

use semnote::{Embedder, Result};

/// Concept axes; each word in a group adds one to that axis.
const CONCEPTS: [&[&str]; 3] = [
    &[
        "grocery", "groceries", "shopping", "shop", "buy", "milk", "eggs", "bread", "list",
    ],
    &["workout", "gym", "leg", "legs", "day", "squats", "exercise"],
    &["trip", "flight", "hotel", "travel", "passport"],
];

/// Deterministic keyword encoder with a handful of concept axes.
///
/// Words outside every concept share one "other" axis, so unrelated notes
/// still produce non-zero vectors.
#[derive(Debug, Default)]
pub struct ConceptEmbedder;

impl ConceptEmbedder {
    pub const DIMENSIONS: usize = CONCEPTS.len() + 1;
}

impl Embedder for ConceptEmbedder {
    fn dimensions(&self) -> usize {
        Self::DIMENSIONS
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; Self::DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            let axis = CONCEPTS
                .iter()
                .position(|group| group.contains(&word.as_str()))
                .unwrap_or(CONCEPTS.len());
            vector[axis] += 1.0;
        }
        Ok(vector)
    }
}
