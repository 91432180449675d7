//! Segment preparation for spectral estimation
//!
//! Constant detrending, windowing and the normalization that turns |X|² into
//! a power spectral density or a power spectrum.

use crate::error::SpectralError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Normalization of the estimated power
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerScaling {
    /// Power spectral density, units² / Hz
    Density,
    /// Power spectrum, units²
    Spectrum,
}

impl PowerScaling {
    /// Factor applied to |X[k]|² for a given window and sample rate
    pub fn factor(&self, window: &[f64], sample_rate: f64) -> f64 {
        match self {
            PowerScaling::Density => {
                let sum_sq: f64 = window.iter().map(|&w| w * w).sum();
                1.0 / (sample_rate * sum_sq)
            }
            PowerScaling::Spectrum => {
                let sum: f64 = window.iter().sum();
                1.0 / (sum * sum)
            }
        }
    }
}

impl FromStr for PowerScaling {
    type Err = SpectralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "density" | "psd" => Ok(PowerScaling::Density),
            "spectrum" => Ok(PowerScaling::Spectrum),
            other => Err(SpectralError::InvalidInput(format!(
                "unknown power scaling '{}'",
                other
            ))),
        }
    }
}

/// Remove the mean, then apply the window, into `out`
///
/// `out` must have the same length as `segment` and `window`.
pub fn detrend_and_window(segment: &[f64], window: &[f64], out: &mut [f64]) {
    let mean = if segment.is_empty() {
        0.0
    } else {
        segment.iter().sum::<f64>() / segment.len() as f64
    };

    for ((o, &s), &w) in out.iter_mut().zip(segment).zip(window) {
        *o = (s - mean) * w;
    }
}

/// Fold a two-sided |X|² into a one-sided spectrum in place
///
/// Interior bins are doubled; DC is not, nor is the Nyquist bin when the FFT
/// length is even.
pub fn fold_one_sided(power: &mut [f64], fft_size: usize) {
    let end = if fft_size % 2 == 0 {
        power.len().saturating_sub(1)
    } else {
        power.len()
    };
    for p in power.iter_mut().take(end).skip(1) {
        *p *= 2.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::windows::{generate_window, WindowType};

    #[test]
    fn test_detrend_and_window() {
        let segment = [1.0, 2.0, 3.0, 4.0];
        let window = [1.0, 0.5, 0.5, 1.0];
        let mut out = [0.0; 4];
        detrend_and_window(&segment, &window, &mut out);
        assert_eq!(out, [-1.5, -0.25, 0.25, 1.5]);
    }

    #[test]
    fn test_scaling_factors() {
        let window = generate_window(WindowType::Rectangular, 10);
        assert!((PowerScaling::Spectrum.factor(&window, 100.0) - 0.01).abs() < 1e-15);
        assert!((PowerScaling::Density.factor(&window, 100.0) - 0.001).abs() < 1e-15);
    }

    #[test]
    fn test_fold_one_sided() {
        let mut even = vec![1.0; 5];
        fold_one_sided(&mut even, 8);
        assert_eq!(even, vec![1.0, 2.0, 2.0, 2.0, 1.0]);

        let mut odd = vec![1.0; 4];
        fold_one_sided(&mut odd, 7);
        assert_eq!(odd, vec![1.0, 2.0, 2.0, 2.0]);
    }
}
