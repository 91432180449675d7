//! Window functions for spectral estimation
//!
//! All windows here are generalized cosine sums:
//! w[n] = Σ_k (-1)^k a_k cos(2πkn/D)
//! with D = M for the periodic form and D = M-1 for the symmetric form.

use crate::error::SpectralError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WindowType {
    /// Hann window: 0.5 - 0.5*cos(2πn/D)
    /// Sidelobe attenuation: ~31 dB
    Hann,

    /// Hamming window: 0.54 - 0.46*cos(2πn/D)
    /// Sidelobe attenuation: ~43 dB
    Hamming,

    /// Blackman window: 0.42 - 0.5*cos(2πn/D) + 0.08*cos(4πn/D)
    /// Sidelobe attenuation: ~58 dB
    Blackman,

    /// 4-term Blackman-Harris window
    /// Sidelobe attenuation: ~92 dB, the default for simulation spectrograms
    BlackmanHarris,

    /// Rectangular window (no windowing)
    Rectangular,
}

impl WindowType {
    /// Cosine-sum coefficients a_0..a_k
    fn coefficients(&self) -> &'static [f64] {
        match self {
            WindowType::Hann => &[0.5, 0.5],
            WindowType::Hamming => &[0.54, 0.46],
            WindowType::Blackman => &[0.42, 0.5, 0.08],
            WindowType::BlackmanHarris => &[0.35875, 0.48829, 0.14128, 0.01168],
            WindowType::Rectangular => &[1.0],
        }
    }

    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            WindowType::Hann => "hann",
            WindowType::Hamming => "hamming",
            WindowType::Blackman => "blackman",
            WindowType::BlackmanHarris => "blackmanharris",
            WindowType::Rectangular => "boxcar",
        }
    }
}

impl Default for WindowType {
    fn default() -> Self {
        WindowType::BlackmanHarris
    }
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WindowType {
    type Err = SpectralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hann" | "hanning" => Ok(WindowType::Hann),
            "hamming" => Ok(WindowType::Hamming),
            "blackman" => Ok(WindowType::Blackman),
            "blackmanharris" | "blackman-harris" => Ok(WindowType::BlackmanHarris),
            "boxcar" | "rectangular" | "rect" => Ok(WindowType::Rectangular),
            other => Err(SpectralError::InvalidInput(format!(
                "unknown window '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for WindowType {
    type Error = SpectralError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WindowType> for String {
    fn from(window: WindowType) -> Self {
        window.name().to_string()
    }
}

fn cosine_sum(window_type: WindowType, length: usize) -> Vec<f64> {
    let coeffs = window_type.coefficients();

    (0..length)
        .map(|n| {
            let base = 2.0 * PI * n as f64 / length as f64;
            coeffs
                .iter()
                .enumerate()
                .map(|(k, &a)| {
                    let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                    sign * a * (k as f64 * base).cos()
                })
                .sum()
        })
        .collect()
}

/// Generate periodic window coefficients (the form used for FFT segments)
///
/// # Arguments
/// * `window_type` - Type of window function
/// * `length` - Number of samples (M)
///
/// # Returns
/// Vector of window coefficients w[n] for n = 0..M-1
pub fn generate_window(window_type: WindowType, length: usize) -> Vec<f64> {
    match length {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => cosine_sum(window_type, length),
    }
}
