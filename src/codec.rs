//! Binary blob format for stored embeddings.
//!
//! A blob is the vector's elements written as little-endian IEEE-754 doubles,
//! back to back, with no header, padding, or length prefix. The dimension is
//! `blob.len() / 8`.

use ndarray::Array1;

use crate::error::{RagError, Result};

const ELEMENT_SIZE: usize = std::mem::size_of::<f64>();

/// Encodes a vector as a little-endian blob. Non-finite values keep their bit pattern.
pub fn encode(vector: &[f64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(std::mem::size_of_val(vector));
    for &value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decodes a blob produced by [`encode`]. An empty blob yields an empty vector.
pub fn decode(blob: &[u8]) -> Result<Array1<f64>> {
    if blob.len() % ELEMENT_SIZE != 0 {
        return Err(RagError::MalformedBlob { len: blob.len() });
    }

    let values = blob
        .chunks_exact(ELEMENT_SIZE)
        .map(|chunk| {
            let mut raw = [0u8; ELEMENT_SIZE];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        })
        .collect::<Vec<_>>();

    Ok(Array1::from(values))
}
