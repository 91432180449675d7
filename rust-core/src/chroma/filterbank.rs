//! Chroma filterbank: FFT bins → pitch classes
//!
//! Each FFT bin is placed on a fractional pitch-class axis (A440 reference,
//! optionally detuned) and spread over the `n_chroma` classes with a Gaussian
//! bump whose width follows the local bin spacing. Columns are normalized,
//! optionally weighted towards a centre octave, and rolled so that row 0 is C.

use super::normalize::{normalize, FillPolicy, Norm};
use crate::error::{Result, SpectralError};
use ndarray::{s, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Filterbank construction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromaParams {
    /// Number of pitch classes
    pub n_chroma: usize,
    /// Deviation from A440 in fractional chroma bins
    pub tuning: f64,
    /// Centre of the octave dominance window (octaves above A0 = 27.5 Hz)
    pub center_octave: f64,
    /// Gaussian half-width of the dominance window; `None` weights all octaves equally
    pub octave_width: Option<f64>,
    /// Column normalization; `None` keeps the raw Gaussian weights
    pub norm: Option<Norm>,
    /// Start the filterbank at C instead of A
    pub base_c: bool,
}

impl Default for ChromaParams {
    fn default() -> Self {
        Self {
            n_chroma: 12,
            tuning: 0.0,
            center_octave: 5.0,
            octave_width: Some(2.0),
            norm: Some(Norm::L2),
            base_c: true,
        }
    }
}

/// Reference pitch for a tuning offset
fn reference_a440(tuning: f64, bins_per_octave: usize) -> f64 {
    440.0 * 2f64.powf(tuning / bins_per_octave as f64)
}

/// Fractional octave number of a frequency, counted from A0/2 (A440 / 16)
pub fn frequency_to_octaves(frequency: f64, tuning: f64, bins_per_octave: usize) -> f64 {
    (frequency / (reference_a440(tuning, bins_per_octave) / 16.0)).log2()
}

/// Inverse of [`frequency_to_octaves`]
pub fn octaves_to_frequency(octaves: f64, tuning: f64, bins_per_octave: usize) -> f64 {
    reference_a440(tuning, bins_per_octave) / 16.0 * 2f64.powf(octaves)
}

/// Build an (n_chroma × (1 + n_fft/2)) filterbank for bins k·sample_rate/n_fft
pub fn build_filterbank(sample_rate: f64, n_fft: usize, params: &ChromaParams) -> Result<Array2<f64>> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(SpectralError::InvalidInput(format!(
            "sample rate must be positive, got {}",
            sample_rate
        )));
    }
    if n_fft < 2 {
        return Err(SpectralError::InvalidInput(format!(
            "chroma filterbank needs at least 2 FFT bins, got {}",
            n_fft
        )));
    }
    if params.n_chroma == 0 {
        return Err(SpectralError::InvalidInput(
            "n_chroma must be positive".to_string(),
        ));
    }
    if let Some(width) = params.octave_width {
        if !(width.is_finite() && width > 0.0) {
            return Err(SpectralError::InvalidInput(format!(
                "octave width must be positive, got {}",
                width
            )));
        }
    }

    let n_chroma = params.n_chroma;
    let nc = n_chroma as f64;

    // Pitch-class position of every bin; DC gets a made-up position 1.5
    // octaves below bin 1 so its weights are broad and half-rotated
    let mut frqbins = Vec::with_capacity(n_fft);
    frqbins.push(0.0);
    frqbins.extend((1..n_fft).map(|k| {
        let frequency = k as f64 * sample_rate / n_fft as f64;
        nc * frequency_to_octaves(frequency, params.tuning, n_chroma)
    }));
    frqbins[0] = frqbins[1] - 1.5 * nc;

    let mut bin_widths: Vec<f64> = frqbins.windows(2).map(|w| (w[1] - w[0]).max(1.0)).collect();
    bin_widths.push(1.0);

    let half = (nc / 2.0).round_ties_even();
    let mut weights = Array2::from_shape_fn((n_chroma, n_fft), |(c, k)| {
        let distance = (frqbins[k] - c as f64 + half + 10.0 * nc).rem_euclid(nc) - half;
        (-0.5 * (2.0 * distance / bin_widths[k]).powi(2)).exp()
    });

    if let Some(norm) = params.norm {
        weights = normalize(weights.view(), norm, Axis(0), None, FillPolicy::Leave)?;
    }

    if let Some(width) = params.octave_width {
        for (mut column, &position) in weights.columns_mut().into_iter().zip(&frqbins) {
            let octave = position / nc;
            let dominance = (-0.5 * ((octave - params.center_octave) / width).powi(2)).exp();
            column *= dominance;
        }
    }

    if params.base_c {
        let shift = 3 * (n_chroma / 12);
        let rolled = Array2::from_shape_fn((n_chroma, n_fft), |(r, k)| {
            weights[[(r + shift) % n_chroma, k]]
        });
        weights = rolled;
    }

    Ok(weights.slice(s![.., ..1 + n_fft / 2]).to_owned())
}
