//! FFT engine using realfft for real-valued signals
//!
//! One plan is shared between clones; each clone owns its own buffers so the
//! engine can be handed to worker threads.

use crate::error::{Result, SpectralError};
use num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// FFT engine for real-valued signals
pub struct FftEngine {
    /// FFT size (number of samples)
    fft_size: usize,

    /// Real FFT processor
    r2c: Arc<dyn RealToComplex<f64>>,

    /// Reusable input buffer
    input_buffer: Vec<f64>,

    /// Reusable output buffer (complex spectrum)
    output_buffer: Vec<Complex<f64>>,
}

impl FftEngine {
    /// Create new FFT engine
    ///
    /// # Arguments
    /// * `fft_size` - FFT size (any length, not only powers of two)
    pub fn new(fft_size: usize) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let r2c = planner.plan_fft_forward(fft_size);

        let input_buffer = r2c.make_input_vec();
        let output_buffer = r2c.make_output_vec();

        Self {
            fft_size,
            r2c,
            input_buffer,
            output_buffer,
        }
    }

    /// Compute |X[k]|² of a zero-padded segment
    ///
    /// # Arguments
    /// * `segment` - Input samples (zero-padded if shorter than fft_size)
    ///
    /// # Returns
    /// Squared magnitude for k = 0..=fft_size/2
    pub fn power(&mut self, segment: &[f64]) -> Result<Vec<f64>> {
        let copy_len = segment.len().min(self.fft_size);
        self.input_buffer[..copy_len].copy_from_slice(&segment[..copy_len]);
        self.input_buffer[copy_len..].fill(0.0);

        self.r2c
            .process(&mut self.input_buffer, &mut self.output_buffer)
            .map_err(|e| SpectralError::InvalidInput(format!("FFT processing failed: {}", e)))?;

        Ok(self.output_buffer.iter().map(|c| c.norm_sqr()).collect())
    }

    /// Get FFT size
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Get number of frequency bins (fft_size/2 + 1 for real FFT)
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Frequency axis in Hz: k·fs/fft_size for k = 0..=fft_size/2
    pub fn frequency_axis(&self, sample_rate: f64) -> Vec<f64> {
        (0..self.num_bins())
            .map(|bin| bin as f64 * sample_rate / self.fft_size as f64)
            .collect()
    }
}

impl Clone for FftEngine {
    fn clone(&self) -> Self {
        Self {
            fft_size: self.fft_size,
            r2c: Arc::clone(&self.r2c),
            input_buffer: self.r2c.make_input_vec(),
            output_buffer: self.r2c.make_output_vec(),
        }
    }
}
