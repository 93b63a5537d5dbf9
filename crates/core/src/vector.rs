//! Cosine similarity scoring over embedding vectors.
//!
//! No approximate-nearest-neighbor index: the expected corpus size (a single
//! project's chunks) makes a linear scan fast enough, and it avoids a whole
//! class of index-staleness bugs that come with maintaining an ANN structure
//! alongside the store.

use crate::error::{AtlasError, AtlasResult};

/// Cosine similarity between two vectors, in `[-1.0, 1.0]`.
///
/// Returns `AtlasError::Argument` if the vectors have different lengths.
/// A zero vector yields a similarity of `0.0` against anything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> AtlasResult<f32> {
    if a.len() != b.len() {
        return Err(AtlasError::Argument(format!(
            "vector dimensionality mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (norm_a * norm_b))
}

/// Score every `(id, vector)` candidate against `query`, descending by score,
/// truncated to `limit`.
pub fn rank_by_similarity<'a, T>(
    query: &[f32],
    candidates: impl Iterator<Item = (T, &'a [f32])>,
    limit: usize,
) -> AtlasResult<Vec<(T, f32)>> {
    let mut scored = Vec::new();
    for (id, vector) in candidates {
        scored.push((id, cosine_similarity(query, vector)?));
    }
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    Ok(scored)
}
