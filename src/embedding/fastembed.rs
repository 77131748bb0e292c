//! FastEmbed-based embedder.
//!
//! Encodes note text with all-MiniLM-L6-v2 via fastembed-rs when the
//! `fastembed-embeddings` feature is enabled. Otherwise a deterministic
//! hashed bag-of-words vector of the requested dimension is produced: notes
//! sharing words with the query score above zero, but there is no semantic
//! similarity.

use super::{DEFAULT_DIMENSIONS, Embedder};
use crate::{Error, Result};

fn reject_empty(texts: &[&str]) -> Result<()> {
    if texts.iter().any(|t| t.trim().is_empty()) {
        return Err(Error::InvalidInput("Cannot embed empty text".to_string()));
    }
    Ok(())
}

// ============================================================================
// Native FastEmbed Implementation (with feature)
// ============================================================================

#[cfg(feature = "fastembed-embeddings")]
mod native {
    use super::{DEFAULT_DIMENSIONS, Embedder, Error, Result, reject_empty};
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::OnceLock;
    use std::time::Instant;

    const MODEL_NAME: &str = "all-MiniLM-L6-v2";

    /// Process-wide model, loaded on first use.
    static EMBEDDING_MODEL: OnceLock<fastembed::TextEmbedding> = OnceLock::new();

    /// `FastEmbed` embedder using all-MiniLM-L6-v2.
    ///
    /// The ONNX model is loaded lazily on the first `embed` call, so startup
    /// stays fast when every note already has a persisted embedding.
    pub struct FastEmbedEmbedder;

    impl FastEmbedEmbedder {
        /// Embedding dimensions of the bundled model.
        pub const DEFAULT_DIMENSIONS: usize = DEFAULT_DIMENSIONS;

        /// Creates a new `FastEmbed` embedder.
        #[must_use]
        pub const fn new() -> Self {
            Self
        }

        /// Creates an embedder for the requested dimensions.
        ///
        /// The model fixes its output at 384 dimensions, so the argument is
        /// ignored. `NoteIndex::with_dimensions` rejects any other value.
        #[must_use]
        pub const fn with_dimensions(_dimensions: usize) -> Self {
            Self
        }

        /// Returns the model name.
        #[must_use]
        pub const fn model_name(&self) -> &'static str {
            MODEL_NAME
        }

        fn model() -> Result<&'static fastembed::TextEmbedding> {
            if let Some(model) = EMBEDDING_MODEL.get() {
                return Ok(model);
            }

            tracing::info!(model = MODEL_NAME, "Loading embedding model");
            let start = Instant::now();

            let options = fastembed::InitOptions::new(fastembed::EmbeddingModel::AllMiniLML6V2)
                .with_show_download_progress(false);
            let model = fastembed::TextEmbedding::try_new(options)
                .map_err(|e| Error::operation("load_embedding_model", e))?;

            tracing::info!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                model = MODEL_NAME,
                "Embedding model loaded"
            );

            // Another thread may have won the race; either instance is fine.
            let _ = EMBEDDING_MODEL.set(model);
            EMBEDDING_MODEL
                .get()
                .ok_or_else(|| Error::operation("load_embedding_model", "model not initialized"))
        }

        /// Runs the model, turning ONNX runtime panics into errors.
        fn run(texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            let model = Self::model()?;
            let batch_size = texts.len();

            catch_unwind(AssertUnwindSafe(|| model.embed(texts, None)))
                .map_err(|panic_info| {
                    let panic_msg = panic_info
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| panic_info.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(
                        panic_message = %panic_msg,
                        batch_size,
                        "ONNX runtime panicked during embedding"
                    );
                    Error::operation("embed", format!("ONNX runtime panic: {panic_msg}"))
                })?
                .map_err(|e| Error::operation("embed", e))
        }
    }

    impl Default for FastEmbedEmbedder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Embedder for FastEmbedEmbedder {
        fn dimensions(&self) -> usize {
            Self::DEFAULT_DIMENSIONS
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            reject_empty(&[text])?;
            Self::run(vec![text.to_string()])?
                .into_iter()
                .next()
                .ok_or_else(|| Error::operation("embed", "no embedding returned from model"))
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            reject_empty(texts)?;
            Self::run(texts.iter().map(|s| (*s).to_string()).collect())
        }
    }
}

// ============================================================================
// Fallback Implementation (without feature)
// ============================================================================

#[cfg(not(feature = "fastembed-embeddings"))]
mod fallback {
    use super::{DEFAULT_DIMENSIONS, Embedder, Result, reject_empty};
    use sha2::{Digest, Sha256};

    /// Upper bound on tokens hashed per text.
    const MAX_TOKENS: usize = 1000;

    /// `FastEmbed` stand-in producing hashed bag-of-words vectors.
    ///
    /// Each lowercased alphanumeric token adds `±1` to one bucket chosen by
    /// its SHA-256 digest; the result is L2-normalised. The digest does not
    /// depend on the toolchain, so persisted vectors stay valid across
    /// upgrades. Identical texts map to
    /// identical vectors and shared words raise the cosine score.
    pub struct FastEmbedEmbedder {
        dimensions: usize,
    }

    impl FastEmbedEmbedder {
        /// Default embedding dimensions (matches all-MiniLM-L6-v2).
        pub const DEFAULT_DIMENSIONS: usize = DEFAULT_DIMENSIONS;

        /// Creates an embedder with the default dimensions.
        #[must_use]
        pub const fn new() -> Self {
            Self::with_dimensions(Self::DEFAULT_DIMENSIONS)
        }

        /// Creates an embedder producing `dimensions`-long vectors.
        #[must_use]
        pub const fn with_dimensions(dimensions: usize) -> Self {
            Self { dimensions }
        }

        /// Returns the model name.
        #[must_use]
        pub const fn model_name(&self) -> &'static str {
            "hashed-bag-of-words"
        }

        fn hashed_bag_of_words(&self, text: &str) -> Vec<f32> {
            let mut embedding = vec![0.0f32; self.dimensions];
            if self.dimensions == 0 {
                return embedding;
            }

            let tokens = text
                .split(|c: char| !c.is_alphanumeric())
                .filter(|token| !token.is_empty())
                .take(MAX_TOKENS);
            for token in tokens {
                let hash = token_hash(&token.to_lowercase());
                let bucket = (hash % self.dimensions as u64) as usize;
                let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
                embedding[bucket] += sign;
            }

            let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for value in &mut embedding {
                    *value /= norm;
                }
            }
            embedding
        }
    }

    /// First eight bytes of the token's SHA-256 digest, little-endian.
    pub(super) fn token_hash(token: &str) -> u64 {
        let digest = Sha256::digest(token.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(prefix)
    }

    impl Default for FastEmbedEmbedder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Embedder for FastEmbedEmbedder {
        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            reject_empty(&[text])?;
            tracing::trace!("Using hashed embedding (fastembed-embeddings feature not enabled)");
            Ok(self.hashed_bag_of_words(text))
        }
    }
}

// ============================================================================
// Public Re-exports
// ============================================================================

#[cfg(feature = "fastembed-embeddings")]
pub use native::FastEmbedEmbedder;

#[cfg(not(feature = "fastembed-embeddings"))]
pub use fallback::FastEmbedEmbedder;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_creation() {
        let embedder = FastEmbedEmbedder::new();
        assert_eq!(embedder.dimensions(), FastEmbedEmbedder::DEFAULT_DIMENSIONS);
    }

    #[test]
    fn test_embed_empty_text() {
        let embedder = FastEmbedEmbedder::default();
        assert!(matches!(embedder.embed(""), Err(Error::InvalidInput(_))));
        assert!(matches!(embedder.embed("   "), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_embed_batch_empty_list() {
        let embedder = FastEmbedEmbedder::new();
        let embeddings = embedder.embed_batch(&[]).expect("embed_batch failed");
        assert!(embeddings.is_empty());
    }

    #[test]
    fn test_embed_batch_with_empty_fails() {
        let embedder = FastEmbedEmbedder::new();
        let result = embedder.embed_batch(&["Valid text", "", "Another valid"]);
        assert!(result.is_err());
    }

    #[cfg(not(feature = "fastembed-embeddings"))]
    mod fallback_tests {
        use super::*;

        fn dot(a: &[f32], b: &[f32]) -> f32 {
            a.iter().zip(b).map(|(x, y)| x * y).sum()
        }

        #[test]
        fn test_custom_dimensions() {
            let embedder = FastEmbedEmbedder::with_dimensions(16);
            assert_eq!(embedder.dimensions(), 16);
            assert_eq!(embedder.embed("hello world").expect("embed failed").len(), 16);
        }

        #[test]
        fn test_deterministic_and_normalized() {
            let embedder = FastEmbedEmbedder::new();
            let a = embedder.embed("Shopping: buy milk and eggs").expect("embed failed");
            let b = embedder.embed("Shopping: buy milk and eggs").expect("embed failed");
            assert_eq!(a, b);

            let magnitude = dot(&a, &a).sqrt();
            assert!((magnitude - 1.0).abs() < 1e-4, "magnitude was {magnitude}");
        }

        #[test]
        fn test_case_and_punctuation_insensitive() {
            let embedder = FastEmbedEmbedder::new();
            let a = embedder.embed("Leg day, at the GYM!").expect("embed failed");
            let b = embedder.embed("leg day at the gym").expect("embed failed");
            assert!((dot(&a, &b) - 1.0).abs() < 1e-4);
        }

        #[test]
        fn test_shared_words_score_higher() {
            let embedder = FastEmbedEmbedder::new();
            let query = embedder.embed("milk eggs").expect("embed failed");
            let related = embedder.embed("buy milk and eggs").expect("embed failed");
            let unrelated = embedder.embed("leg day at gym").expect("embed failed");
            assert!(dot(&query, &related) > dot(&query, &unrelated));
        }

        #[test]
        fn test_token_hash_is_pinned() {
            // SHA-256("milk") starts with 88 25 e7 65 30 f8 7f f5.
            assert_eq!(super::super::fallback::token_hash("milk"), 0xf57f_f830_65e7_2588);
        }

        #[test]
        fn test_punctuation_only_text_is_zero_vector() {
            let embedder = FastEmbedEmbedder::with_dimensions(8);
            let vector = embedder.embed("?!").expect("embed failed");
            assert!(vector.iter().all(|v| *v == 0.0));
        }
    }

    #[cfg(feature = "fastembed-embeddings")]
    mod fastembed_tests {
        use super::*;

        #[test]
        fn test_embed_dimensions_and_determinism() {
            let embedder = FastEmbedEmbedder::new();
            let first = embedder.embed("Rust programming language").expect("embed failed");
            let second = embedder.embed("Rust programming language").expect("embed failed");
            assert_eq!(first.len(), FastEmbedEmbedder::DEFAULT_DIMENSIONS);
            for (v1, v2) in first.iter().zip(second.iter()) {
                assert!((v1 - v2).abs() < f32::EPSILON);
            }
        }
    }
}
