use thiserror::Error;

use crate::error::{ErrorCode, SimgraphError};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityError {
    #[error("cannot compare empty vectors")]
    Empty,
    #[error("vector dimensions differ: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
    #[error("degenerate vector with zero norm")]
    ZeroNorm,
}

impl SimgraphError for SimilarityError {
    fn error_code(&self) -> ErrorCode {
        ErrorCode::InvalidArgument
    }
}

/// Cosine similarity of two equal-length vectors, clamped to [-1.0, 1.0].
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Result<f64, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    if a.is_empty() {
        return Err(SimilarityError::Empty);
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(SimilarityError::ZeroNorm);
    }

    Ok((dot / (norm_a * norm_b)).clamp(-1.0, 1.0))
}
