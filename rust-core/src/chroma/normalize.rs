//! Slice-wise normalization of 2-D arrays
//!
//! Every lane along `axis` (columns for `Axis(0)`, rows for `Axis(1)`) is
//! divided by its norm. Lanes whose norm falls below the threshold are
//! handled by a [`FillPolicy`] instead.

use crate::error::{Result, SpectralError};
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Norm measured along each lane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    /// Largest absolute value
    Max,
    /// Smallest absolute value
    Min,
    /// Number of non-zero entries
    Count,
    /// l_p norm, p > 0
    P(f64),
}

impl Norm {
    pub const L1: Norm = Norm::P(1.0);
    pub const L2: Norm = Norm::P(2.0);

    fn validate(&self) -> Result<()> {
        match *self {
            Norm::P(p) if !(p.is_finite() && p > 0.0) => Err(SpectralError::InvalidNormSpec(
                format!("l_p norm needs a finite p > 0, got {}", p),
            )),
            _ => Ok(()),
        }
    }

    fn length<'a>(&self, lane: impl Iterator<Item = &'a f64>) -> f64 {
        let magnitudes = lane.map(|v| v.abs());
        match *self {
            Norm::Max => magnitudes.fold(0.0, f64::max),
            Norm::Min => magnitudes.fold(f64::INFINITY, f64::min),
            Norm::Count => magnitudes.filter(|&m| m > 0.0).count() as f64,
            Norm::P(p) if p == 1.0 => magnitudes.sum(),
            Norm::P(p) if p == 2.0 => magnitudes.map(|m| m * m).sum::<f64>().sqrt(),
            Norm::P(p) => magnitudes.map(|m| m.powf(p)).sum::<f64>().powf(1.0 / p),
        }
    }

    /// Value of a uniform lane of `len` entries whose norm is 1
    fn fill_value(&self, len: usize) -> f64 {
        match *self {
            Norm::P(p) => (len as f64).powf(-1.0 / p),
            _ => 1.0,
        }
    }
}

/// Treatment of lanes whose norm is below the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillPolicy {
    /// Leave unnormalized
    #[default]
    Leave,
    /// Set to zero
    Zero,
    /// Replace with a uniform lane of norm 1
    Uniform,
}

/// Normalize every lane of `s` along `axis`
///
/// `threshold` defaults to the smallest positive normal `f64`.
pub fn normalize(
    s: ArrayView2<'_, f64>,
    norm: Norm,
    axis: Axis,
    threshold: Option<f64>,
    fill: FillPolicy,
) -> Result<Array2<f64>> {
    let threshold = match threshold {
        None => f64::MIN_POSITIVE,
        Some(t) if t > 0.0 => t,
        Some(t) => {
            return Err(SpectralError::InvalidNormSpec(format!(
                "threshold must be strictly positive, got {}",
                t
            )))
        }
    };
    norm.validate()?;
    if norm == Norm::Count && fill == FillPolicy::Uniform {
        return Err(SpectralError::InvalidNormSpec(
            "no uniform lane has a non-zero count of exactly 1".to_string(),
        ));
    }
    if s.iter().any(|v| !v.is_finite()) {
        return Err(SpectralError::InvalidNormSpec(
            "input must be finite".to_string(),
        ));
    }

    let lane_len = s.len_of(axis);
    let mut out = s.to_owned();
    for mut lane in out.lanes_mut(axis) {
        let length = norm.length(lane.iter());
        if length >= threshold {
            lane.mapv_inplace(|v| v / length);
            continue;
        }
        match fill {
            FillPolicy::Leave => {}
            FillPolicy::Zero => lane.fill(0.0),
            FillPolicy::Uniform => lane.fill(norm.fill_value(lane_len)),
        }
    }
    Ok(out)
}
