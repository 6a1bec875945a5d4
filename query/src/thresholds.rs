//! Per-depth acceptance thresholds for the network builder.
//!
//! Depth 0 (children of the query node) uses the first entry, depth 1 the
//! second and so on; depths beyond the table reuse the last entry. Tables
//! must be non-increasing: deeper levels are never stricter than shallower
//! ones, so a broader neighbourhood opens up as exploration moves away from
//! the query.

use thiserror::Error;

/// Thresholds used when no configuration overrides them.
pub const DEFAULT_THRESHOLDS: [f64; 3] = [0.7, 0.65, 0.6];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("threshold table must contain at least one entry")]
    Empty,
    #[error("threshold {value} at depth {depth} is outside [-1, 1]")]
    OutOfRange { depth: usize, value: f64 },
    #[error("threshold {value} at depth {depth} is stricter than {previous} at the previous depth")]
    Increasing {
        depth: usize,
        previous: f64,
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    per_depth: Vec<f64>,
}

impl ThresholdTable {
    pub fn new(per_depth: Vec<f64>) -> Result<Self, ThresholdError> {
        if per_depth.is_empty() {
            return Err(ThresholdError::Empty);
        }
        for (depth, &value) in per_depth.iter().enumerate() {
            if !(-1.0..=1.0).contains(&value) {
                return Err(ThresholdError::OutOfRange { depth, value });
            }
        }
        for (depth, pair) in per_depth.windows(2).enumerate() {
            if pair[1] > pair[0] {
                return Err(ThresholdError::Increasing {
                    depth: depth + 1,
                    previous: pair[0],
                    value: pair[1],
                });
            }
        }
        Ok(Self { per_depth })
    }

    /// A single threshold applied at every depth.
    pub fn uniform(value: f64) -> Result<Self, ThresholdError> {
        Self::new(vec![value])
    }

    pub fn for_depth(&self, depth: u8) -> f64 {
        let idx = usize::from(depth).min(self.per_depth.len() - 1);
        self.per_depth[idx]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.per_depth
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            per_depth: DEFAULT_THRESHOLDS.to_vec(),
        }
    }
}
