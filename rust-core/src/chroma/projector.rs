//! Projection of power spectrograms onto pitch classes

use super::filterbank::{build_filterbank, ChromaParams};
use super::normalize::{normalize, FillPolicy, Norm};
use crate::error::{Result, SpectralError};
use crate::spectrum::Spectrogram;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Column normalization applied after projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChromaNorm {
    /// Peak of every time column scaled to 1
    Max,
    /// Every time column sums to 1 (input for entropy scoring)
    #[default]
    Sum,
    /// Unnormalized
    Raw,
}

/// Multiply filterbank (n_chroma × n_freq) by power (n_freq × n_time)
pub fn project(filterbank: &Array2<f64>, power: &Array2<f64>, norm: ChromaNorm) -> Result<Array2<f64>> {
    if filterbank.ncols() != power.nrows() {
        return Err(SpectralError::InvalidInput(format!(
            "filterbank has {} frequency bins but the power matrix has {}",
            filterbank.ncols(),
            power.nrows()
        )));
    }

    normalize_chroma(filterbank.dot(power), norm)
}

/// Column normalization of an already projected chroma matrix
pub fn normalize_chroma(chroma: Array2<f64>, norm: ChromaNorm) -> Result<Array2<f64>> {
    match norm {
        ChromaNorm::Raw => Ok(chroma),
        ChromaNorm::Max => normalize(chroma.view(), Norm::Max, Axis(0), None, FillPolicy::Leave),
        ChromaNorm::Sum => {
            let empty = chroma
                .columns()
                .into_iter()
                .filter(|column| column.sum() <= 0.0)
                .count();
            if empty > 0 {
                log::warn!(
                    "[Chroma] {} time columns carry no energy and stay unnormalized",
                    empty
                );
            }
            normalize(chroma.view(), Norm::L1, Axis(0), None, FillPolicy::Leave)
        }
    }
}

/// Cache key: every parameter the filterbank depends on, floats by bit pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FilterbankKey {
    sample_rate: u64,
    n_fft: usize,
    n_chroma: usize,
    tuning: u64,
    center_octave: u64,
    octave_width: Option<u64>,
    norm: Option<(u8, u64)>,
    base_c: bool,
}

impl FilterbankKey {
    fn new(sample_rate: f64, n_fft: usize, params: &ChromaParams) -> Self {
        Self {
            sample_rate: sample_rate.to_bits(),
            n_fft,
            n_chroma: params.n_chroma,
            tuning: params.tuning.to_bits(),
            center_octave: params.center_octave.to_bits(),
            octave_width: params.octave_width.map(f64::to_bits),
            norm: params.norm.map(|norm| match norm {
                Norm::Max => (0, 0),
                Norm::Min => (1, 0),
                Norm::Count => (2, 0),
                Norm::P(p) => (3, p.to_bits()),
            }),
            base_c: params.base_c,
        }
    }
}

/// Chroma projection with one filterbank per distinct parameter tuple
#[derive(Debug, Clone)]
pub struct ChromaProjector {
    params: ChromaParams,
    cache: HashMap<FilterbankKey, Arc<Array2<f64>>>,
}

impl ChromaProjector {
    pub fn new(params: ChromaParams) -> Self {
        Self {
            params,
            cache: HashMap::new(),
        }
    }

    pub fn params(&self) -> &ChromaParams {
        &self.params
    }

    /// Filterbank for a sample rate and FFT length, built on first use
    pub fn filterbank(&mut self, sample_rate: f64, n_fft: usize) -> Result<Arc<Array2<f64>>> {
        let key = FilterbankKey::new(sample_rate, n_fft, &self.params);
        if let Some(filterbank) = self.cache.get(&key) {
            return Ok(Arc::clone(filterbank));
        }

        let filterbank = Arc::new(build_filterbank(sample_rate, n_fft, &self.params)?);
        log::debug!(
            "[Chroma] built {}×{} filterbank (fs={}, n_fft={})",
            filterbank.nrows(),
            filterbank.ncols(),
            sample_rate,
            n_fft
        );
        self.cache.insert(key, Arc::clone(&filterbank));
        Ok(filterbank)
    }

    /// Chroma matrix of a spectrogram, shape (n_chroma × n_time_bins)
    pub fn project(&mut self, spectrogram: &Spectrogram, norm: ChromaNorm) -> Result<Array2<f64>> {
        let filterbank = self.filterbank(spectrogram.fs, spectrogram.nfft)?;
        project(&filterbank, &spectrogram.power, norm)
    }

    pub fn cached_filterbanks(&self) -> usize {
        self.cache.len()
    }
}

impl Default for ChromaProjector {
    fn default() -> Self {
        Self::new(ChromaParams::default())
    }
}
