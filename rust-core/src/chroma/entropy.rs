//! Entropy-based periodicity score of chroma columns
//!
//! Score = 1 − H/ln(n_chroma), where H is the Shannon entropy of a
//! sum-normalized chroma column: 1 for all energy in one pitch class, 0 for
//! energy spread evenly over every class. A column without energy has no
//! periodic structure and scores 0.

use crate::error::{Result, SpectralError};
use ndarray::{ArrayView2, Axis};

/// Tolerance on column sums
const SUM_TOLERANCE: f64 = 1e-6;

/// Per-time-bin scores with their mean
#[derive(Debug, Clone, PartialEq)]
pub struct Periodicity {
    pub scores: Vec<f64>,
    pub mean: f64,
}

/// Periodicity score of every column of a sum-normalized chroma matrix
pub fn entropy_score(chroma: ArrayView2<'_, f64>, n_chroma: usize) -> Result<Vec<f64>> {
    if n_chroma < 2 {
        return Err(SpectralError::InvalidInput(format!(
            "entropy needs at least 2 pitch classes, got {}",
            n_chroma
        )));
    }
    if chroma.nrows() != n_chroma {
        return Err(SpectralError::InvalidInput(format!(
            "chroma matrix has {} rows, expected {}",
            chroma.nrows(),
            n_chroma
        )));
    }

    let max_entropy = (n_chroma as f64).ln();
    chroma
        .axis_iter(Axis(1))
        .enumerate()
        .map(|(t, column)| {
            if column.iter().any(|&c| !c.is_finite() || c < 0.0) {
                return Err(SpectralError::InvalidInput(format!(
                    "chroma column {} has negative or non-finite entries",
                    t
                )));
            }
            let total = column.sum();
            if total == 0.0 {
                log::warn!("[Entropy] chroma column {} carries no energy; scored 0", t);
                return Ok(0.0);
            }
            if (total - 1.0).abs() > SUM_TOLERANCE {
                return Err(SpectralError::InvalidInput(format!(
                    "chroma column {} sums to {}, expected 1",
                    t, total
                )));
            }

            let entropy: f64 = column
                .iter()
                .filter(|&&c| c > 0.0)
                .map(|&c| -c * c.ln())
                .sum();
            Ok((1.0 - entropy / max_entropy).clamp(0.0, 1.0))
        })
        .collect()
}

/// Mean of per-bin scores
pub fn mean_periodicity(scores: &[f64]) -> Result<f64> {
    if scores.is_empty() {
        return Err(SpectralError::InvalidInput(
            "no periodicity scores to average".to_string(),
        ));
    }
    Ok(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Scores and their mean in one call
pub fn periodicity(chroma: ArrayView2<'_, f64>, n_chroma: usize) -> Result<Periodicity> {
    let scores = entropy_score(chroma, n_chroma)?;
    let mean = mean_periodicity(&scores)?;
    Ok(Periodicity { scores, mean })
}
