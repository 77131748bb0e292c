//! Binary encoding of embedding vectors.
//!
//! Vectors are persisted as the little-endian bytes of each `f32`, packed
//! without a header. The dimension is implied by the blob length.

use crate::{Error, Result};

const F32_WIDTH: usize = std::mem::size_of::<f32>();

/// Encodes a vector into its blob representation.
#[must_use]
pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|value| value.to_le_bytes()).collect()
}

/// Decodes a blob back into a vector.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the blob length is not a multiple of 4.
pub fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % F32_WIDTH != 0 {
        return Err(Error::operation(
            "decode_embedding",
            format!(
                "blob length {} is not a multiple of {F32_WIDTH}",
                bytes.len()
            ),
        ));
    }

    Ok(bytes
        .chunks_exact(F32_WIDTH)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
