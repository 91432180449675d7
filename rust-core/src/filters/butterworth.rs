//! Digital Butterworth filter design
//!
//! Analog prototype → frequency transform → bilinear transform, realised as a
//! cascade of second-order sections for numerical robustness at high orders
//! and low normalized cutoffs.

use crate::error::{Result, SpectralError};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;

/// Tolerance used to decide whether a root is real
const ROOT_IMAG_TOL: f64 = 1e-10;

/// Filter response type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Band-pass between lowcut and highcut
    Band,
    /// Band-stop between lowcut and highcut
    Stop,
    /// High-pass above lowcut (highcut unused)
    Highpass,
    /// Low-pass below highcut (lowcut unused)
    Lowpass,
}

impl FilterMode {
    /// Whether the mode uses both cutoffs
    pub fn is_two_sided(&self) -> bool {
        matches!(self, FilterMode::Band | FilterMode::Stop)
    }
}

impl FromStr for FilterMode {
    type Err = SpectralError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "band" | "bandpass" => Ok(FilterMode::Band),
            "stop" | "bandstop" => Ok(FilterMode::Stop),
            "highpass" | "high" => Ok(FilterMode::Highpass),
            "lowpass" | "low" => Ok(FilterMode::Lowpass),
            other => Err(SpectralError::InvalidFilterSpec(format!(
                "unknown filter mode '{}'",
                other
            ))),
        }
    }
}

/// Filter specification in physical units
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Low cutoff frequency (Hz)
    pub lowcut: f64,

    /// High cutoff frequency (Hz)
    pub highcut: f64,

    /// Sample rate (Hz)
    pub fs: f64,

    /// Filter order
    pub order: usize,

    /// Response type
    pub mode: FilterMode,
}

impl FilterSpec {
    /// High-pass specification, the default conditioning for simulation traces
    pub fn highpass(lowcut: f64, fs: f64, order: usize) -> Self {
        Self {
            lowcut,
            highcut: f64::INFINITY,
            fs,
            order,
            mode: FilterMode::Highpass,
        }
    }

    /// Low-pass specification
    pub fn lowpass(highcut: f64, fs: f64, order: usize) -> Self {
        Self {
            lowcut: 0.0,
            highcut,
            fs,
            order,
            mode: FilterMode::Lowpass,
        }
    }

    /// Band-pass specification
    pub fn bandpass(lowcut: f64, highcut: f64, fs: f64, order: usize) -> Self {
        Self {
            lowcut,
            highcut,
            fs,
            order,
            mode: FilterMode::Band,
        }
    }

    /// Band-stop specification
    pub fn bandstop(lowcut: f64, highcut: f64, fs: f64, order: usize) -> Self {
        Self {
            lowcut,
            highcut,
            fs,
            order,
            mode: FilterMode::Stop,
        }
    }

    /// Nyquist frequency (Hz)
    pub fn nyquist(&self) -> f64 {
        0.5 * self.fs
    }

    /// Check cutoffs against each other and against Nyquist
    ///
    /// Only the cutoffs the mode actually uses are checked.
    pub fn validate(&self) -> Result<()> {
        if !(self.fs.is_finite() && self.fs > 0.0) {
            return Err(SpectralError::InvalidFilterSpec(format!(
                "sample rate must be positive, got {}",
                self.fs
            )));
        }
        if self.order == 0 {
            return Err(SpectralError::InvalidFilterSpec(
                "filter order must be at least 1".to_string(),
            ));
        }

        let nyq = self.nyquist();
        let check_cutoff = |name: &str, value: f64| -> Result<()> {
            if !(value.is_finite() && value > 0.0) {
                return Err(SpectralError::InvalidFilterSpec(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
            if value >= nyq {
                return Err(SpectralError::InvalidFilterSpec(format!(
                    "{} {} Hz is not below the Nyquist frequency {} Hz",
                    name, value, nyq
                )));
            }
            Ok(())
        };

        match self.mode {
            FilterMode::Highpass => check_cutoff("lowcut", self.lowcut),
            FilterMode::Lowpass => check_cutoff("highcut", self.highcut),
            FilterMode::Band | FilterMode::Stop => {
                check_cutoff("lowcut", self.lowcut)?;
                check_cutoff("highcut", self.highcut)?;
                if self.lowcut >= self.highcut {
                    return Err(SpectralError::InvalidFilterSpec(format!(
                        "lowcut {} Hz must be below highcut {} Hz",
                        self.lowcut, self.highcut
                    )));
                }
                Ok(())
            }
        }
    }

    /// Design the digital filter
    pub fn design(&self) -> Result<SosFilter> {
        self.validate()?;

        let nyq = self.nyquist();
        let prototype = Zpk::analog_prototype(self.order);

        let analog = match self.mode {
            FilterMode::Lowpass => prototype.to_lowpass(prewarp(self.highcut / nyq)),
            FilterMode::Highpass => prototype.to_highpass(prewarp(self.lowcut / nyq)),
            FilterMode::Band => {
                let (w1, w2) = (prewarp(self.lowcut / nyq), prewarp(self.highcut / nyq));
                prototype.to_bandpass((w1 * w2).sqrt(), w2 - w1)
            }
            FilterMode::Stop => {
                let (w1, w2) = (prewarp(self.lowcut / nyq), prewarp(self.highcut / nyq));
                prototype.to_bandstop((w1 * w2).sqrt(), w2 - w1)
            }
        };

        Ok(analog.bilinear().into_sections())
    }
}

/// Pre-warp a Nyquist-normalized frequency for the bilinear transform (fs = 2)
fn prewarp(wn: f64) -> f64 {
    4.0 * (PI * wn / 2.0).tan()
}

/// Zeros, poles and gain of a filter
#[derive(Debug, Clone)]
struct Zpk {
    zeros: Vec<Complex64>,
    poles: Vec<Complex64>,
    gain: f64,
}

impl Zpk {
    /// Analog Butterworth prototype with unit cutoff
    fn analog_prototype(order: usize) -> Self {
        let n = order as f64;
        let poles = (0..order)
            .map(|i| {
                let m = -n + 1.0 + 2.0 * i as f64;
                -Complex64::from_polar(1.0, PI * m / (2.0 * n))
            })
            .collect();

        Self {
            zeros: Vec::new(),
            poles,
            gain: 1.0,
        }
    }

    fn degree(&self) -> usize {
        self.poles.len() - self.zeros.len()
    }

    /// Product of (-root) over a root set
    fn neg_product(roots: &[Complex64]) -> Complex64 {
        roots.iter().fold(Complex64::new(1.0, 0.0), |acc, &r| acc * (-r))
    }

    fn to_lowpass(self, wo: f64) -> Self {
        let degree = self.degree();
        Self {
            zeros: self.zeros.iter().map(|&z| z * wo).collect(),
            poles: self.poles.iter().map(|&p| p * wo).collect(),
            gain: self.gain * wo.powi(degree as i32),
        }
    }

    fn to_highpass(self, wo: f64) -> Self {
        let degree = self.degree();
        let gain = self.gain * (Self::neg_product(&self.zeros) / Self::neg_product(&self.poles)).re;

        let mut zeros: Vec<Complex64> = self.zeros.iter().map(|&z| wo / z).collect();
        zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree));

        Self {
            zeros,
            poles: self.poles.iter().map(|&p| wo / p).collect(),
            gain,
        }
    }

    fn to_bandpass(self, wo: f64, bw: f64) -> Self {
        let degree = self.degree();
        let split = |roots: &[Complex64]| -> Vec<Complex64> {
            let scaled: Vec<Complex64> = roots.iter().map(|&r| r * (bw / 2.0)).collect();
            let upper = scaled.iter().map(|&r| r + (r * r - wo * wo).sqrt());
            let lower = scaled.iter().map(|&r| r - (r * r - wo * wo).sqrt());
            upper.chain(lower).collect()
        };

        let mut zeros = split(&self.zeros);
        zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree));

        Self {
            zeros,
            poles: split(&self.poles),
            gain: self.gain * bw.powi(degree as i32),
        }
    }

    fn to_bandstop(self, wo: f64, bw: f64) -> Self {
        let degree = self.degree();
        let gain = self.gain * (Self::neg_product(&self.zeros) / Self::neg_product(&self.poles)).re;
        let split = |roots: &[Complex64]| -> Vec<Complex64> {
            let inverted: Vec<Complex64> = roots.iter().map(|&r| (bw / 2.0) / r).collect();
            let upper = inverted.iter().map(|&r| r + (r * r - wo * wo).sqrt());
            let lower = inverted.iter().map(|&r| r - (r * r - wo * wo).sqrt());
            upper.chain(lower).collect()
        };

        let mut zeros = split(&self.zeros);
        zeros.extend(std::iter::repeat(Complex64::new(0.0, wo)).take(degree));
        zeros.extend(std::iter::repeat(Complex64::new(0.0, -wo)).take(degree));

        Self {
            zeros,
            poles: split(&self.poles),
            gain,
        }
    }

    /// Bilinear transform with fs = 2
    fn bilinear(self) -> Self {
        let fs2 = Complex64::new(4.0, 0.0);
        let degree = self.degree();

        let num = self.zeros.iter().fold(Complex64::new(1.0, 0.0), |acc, &z| acc * (fs2 - z));
        let den = self.poles.iter().fold(Complex64::new(1.0, 0.0), |acc, &p| acc * (fs2 - p));

        let mut zeros: Vec<Complex64> = self.zeros.iter().map(|&z| (fs2 + z) / (fs2 - z)).collect();
        zeros.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(degree));

        Self {
            zeros,
            poles: self.poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect(),
            gain: self.gain * (num / den).re,
        }
    }

    fn into_sections(self) -> SosFilter {
        let mut numerators = quadratic_factors(&self.zeros);
        let mut denominators = quadratic_factors(&self.poles);

        let count = numerators.len().max(denominators.len()).max(1);
        numerators.resize(count, [1.0, 0.0, 0.0]);
        denominators.resize(count, [1.0, 0.0, 0.0]);

        let mut sections: Vec<Biquad> = numerators
            .into_iter()
            .zip(denominators)
            .map(|(b, a)| Biquad { b, a })
            .collect();

        for coeff in sections[0].b.iter_mut() {
            *coeff *= self.gain;
        }

        SosFilter { sections }
    }
}

/// Group roots into monic polynomial factors of degree ≤ 2
///
/// Complex roots contribute one factor per conjugate pair (the upper-half
/// member stands for both); real roots are paired in order.
fn quadratic_factors(roots: &[Complex64]) -> Vec<[f64; 3]> {
    let mut factors = Vec::with_capacity(roots.len() / 2 + 1);
    let mut reals = Vec::new();

    for root in roots {
        let tol = ROOT_IMAG_TOL * root.norm().max(1.0);
        if root.im > tol {
            factors.push([1.0, -2.0 * root.re, root.norm_sqr()]);
        } else if root.im.abs() <= tol {
            reals.push(root.re);
        }
    }

    for pair in reals.chunks(2) {
        match pair {
            [r1, r2] => factors.push([1.0, -(r1 + r2), r1 * r2]),
            [r] => factors.push([1.0, -r, 0.0]),
            _ => unreachable!(),
        }
    }

    factors
}

/// One second-order section, a[0] == 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

impl Biquad {
    /// Gain at DC (z = 1)
    pub fn dc_gain(&self) -> f64 {
        self.b.iter().sum::<f64>() / self.a.iter().sum::<f64>()
    }

    /// Whether this section is first order (no z^-2 terms)
    pub fn is_first_order(&self) -> bool {
        self.b[2] == 0.0 && self.a[2] == 0.0
    }
}

/// Cascade of second-order sections
#[derive(Debug, Clone)]
pub struct SosFilter {
    pub(crate) sections: Vec<Biquad>,
}

impl SosFilter {
    /// Sections in cascade order
    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    /// Calculate frequency response at given frequencies
    ///
    /// # Arguments
    /// * `frequencies` - Normalized frequencies (units of π rad/sample, 1 = Nyquist)
    ///
    /// # Returns
    /// Complex frequency response H(e^jω)
    pub fn frequency_response(&self, frequencies: &[f64]) -> Vec<Complex64> {
        frequencies
            .iter()
            .map(|&omega| {
                let z1 = Complex64::from_polar(1.0, -omega * PI);
                let z2 = z1 * z1;
                self.sections.iter().fold(Complex64::new(1.0, 0.0), |acc, s| {
                    let num = s.b[0] + z1 * s.b[1] + z2 * s.b[2];
                    let den = s.a[0] + z1 * s.a[1] + z2 * s.a[2];
                    acc * num / den
                })
            })
            .collect()
    }

    /// Magnitude response (linear) at normalized frequencies
    pub fn magnitude_response(&self, frequencies: &[f64]) -> Vec<f64> {
        self.frequency_response(frequencies)
            .iter()
            .map(|h| h.norm())
            .collect()
    }
}
