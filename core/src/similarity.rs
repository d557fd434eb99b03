use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimilarityError {
    #[error("cosine similarity is undefined for a zero-magnitude vector")]
    ZeroMagnitudeVector,
    #[error("cosine similarity is undefined for non-finite components")]
    NonFiniteInput,
}

/// Cosine similarity over the shared prefix `[0, min(a.len(), b.len()))`.
///
/// Sums are accumulated in `f64`, so any finite `f32` input neither
/// overflows nor underflows. Returns an error instead of NaN when either
/// vector has zero magnitude over that range (this includes empty vectors)
/// or carries an infinite/NaN component. The result is clamped to [-1, 1].
pub fn checked_cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, SimilarityError> {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if !(dot.is_finite() && norm_a.is_finite() && norm_b.is_finite()) {
        return Err(SimilarityError::NonFiniteInput);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(SimilarityError::ZeroMagnitudeVector);
    }
    let cosine = dot / (norm_a.sqrt() * norm_b.sqrt());
    Ok(cosine.clamp(-1.0, 1.0) as f32)
}

/// Cosine similarity with degenerate input resolved to `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    checked_cosine_similarity(a, b).unwrap_or(0.0)
}
