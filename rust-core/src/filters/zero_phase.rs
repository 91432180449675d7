//! Zero-phase (forward-backward) filtering with second-order sections
//!
//! Each pass runs the cascade in transposed direct form II. The signal is
//! extended at both ends by odd reflection and each pass starts from the
//! steady-state delay line for a step of the edge value, which suppresses
//! start-up transients.

use super::butterworth::{Biquad, SosFilter};
use crate::error::{Result, SpectralError};

/// Delay-line state of one section
type SectionState = [f64; 2];

impl Biquad {
    /// Steady-state delay line for a unit step input
    fn step_state(&self) -> SectionState {
        let gain = self.dc_gain();
        let z1 = self.b[2] - self.a[2] * gain;
        let z0 = self.b[1] - self.a[1] * gain + z1;
        [z0, z1]
    }

    #[inline]
    fn process_sample(&self, input: f64, state: &mut SectionState) -> f64 {
        let output = self.b[0] * input + state[0];
        state[0] = self.b[1] * input - self.a[1] * output + state[1];
        state[1] = self.b[2] * input - self.a[2] * output;
        output
    }
}

impl SosFilter {
    /// Number of samples added to each side before filtering
    pub fn pad_length(&self) -> usize {
        let first_order = self.sections.iter().filter(|s| s.is_first_order()).count();
        3 * (2 * self.sections.len() + 1 - first_order)
    }

    /// Steady-state initial conditions for a unit step through the whole cascade
    fn initial_state(&self) -> Vec<SectionState> {
        let mut scale = 1.0;
        self.sections
            .iter()
            .map(|section| {
                let [z0, z1] = section.step_state();
                let state = [z0 * scale, z1 * scale];
                scale *= section.dc_gain();
                state
            })
            .collect()
    }

    /// Causal filtering of a block, starting from the given state
    fn process_block(&self, input: &[f64], state: &mut [SectionState]) -> Vec<f64> {
        input
            .iter()
            .map(|&x| {
                self.sections
                    .iter()
                    .zip(state.iter_mut())
                    .fold(x, |sample, (section, st)| section.process_sample(sample, st))
            })
            .collect()
    }

    /// Zero-phase filtering: forward pass, then a time-reversed backward pass
    ///
    /// # Returns
    /// Filtered signal with the same length as the input and no phase lag
    pub fn filtfilt(&self, input: &[f64]) -> Result<Vec<f64>> {
        let pad = self.pad_length();
        let n = input.len();
        if n <= pad {
            return Err(SpectralError::DegenerateSignal(format!(
                "zero-phase filtering needs more than {} samples, got {}",
                pad, n
            )));
        }

        let extended = odd_extension(input, pad);
        let zi = self.initial_state();

        let mut state = scaled_state(&zi, extended[0]);
        let mut forward = self.process_block(&extended, &mut state);

        forward.reverse();
        let mut state = scaled_state(&zi, forward[0]);
        let mut backward = self.process_block(&forward, &mut state);
        backward.reverse();

        Ok(backward[pad..pad + n].to_vec())
    }
}

fn scaled_state(zi: &[SectionState], x0: f64) -> Vec<SectionState> {
    zi.iter().map(|&[z0, z1]| [z0 * x0, z1 * x0]).collect()
}

/// Odd extension: reflect about both end points
///
/// Requires `pad < signal.len()`.
fn odd_extension(signal: &[f64], pad: usize) -> Vec<f64> {
    let n = signal.len();
    let first = signal[0];
    let last = signal[n - 1];

    let mut extended = Vec::with_capacity(n + 2 * pad);
    extended.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
    extended.extend_from_slice(signal);
    extended.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i]));
    extended
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::butterworth::FilterSpec;
    use std::f64::consts::PI;

    #[test]
    fn test_odd_extension() {
        let signal = [1.0, 2.0, 4.0, 7.0];
        let ext = odd_extension(&signal, 2);
        assert_eq!(ext, vec![-2.0, 0.0, 1.0, 2.0, 4.0, 7.0, 10.0, 12.0]);
    }

    #[test]
    fn test_steady_state_passes_constant() {
        let filter = FilterSpec::lowpass(50.0, 1000.0, 4).design().unwrap();
        let mut state = scaled_state(&filter.initial_state(), 3.0);
        let output = filter.process_block(&[3.0; 64], &mut state);

        for y in output {
            assert!((y - 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_filtfilt_preserves_passband_sine_without_lag() {
        let fs = 1000.0;
        let filter = FilterSpec::highpass(5.0, fs, 4).design().unwrap();

        let signal: Vec<f64> = (0..2000)
            .map(|n| (2.0 * PI * 50.0 * n as f64 / fs).sin())
            .collect();
        let filtered = filter.filtfilt(&signal).unwrap();

        assert_eq!(filtered.len(), signal.len());
        for i in 500..1500 {
            assert!(
                (filtered[i] - signal[i]).abs() < 0.01,
                "sample {}: {} vs {}",
                i,
                filtered[i],
                signal[i]
            );
        }
    }

    #[test]
    fn test_filtfilt_removes_offset() {
        let fs = 2500.0;
        let filter = FilterSpec::highpass(25.0, fs, 6).design().unwrap();

        let signal: Vec<f64> = (0..5000)
            .map(|n| 2.0 + (2.0 * PI * 200.0 * n as f64 / fs).sin())
            .collect();
        let filtered = filter.filtfilt(&signal).unwrap();

        let mean: f64 = filtered[1000..4000].iter().sum::<f64>() / 3000.0;
        assert!(mean.abs() < 0.01, "residual offset {}", mean);
    }

    #[test]
    fn test_filtfilt_short_signal() {
        let filter = FilterSpec::lowpass(50.0, 1000.0, 4).design().unwrap();
        let pad = filter.pad_length();
        assert_eq!(pad, 15);
        assert!(matches!(
            filter.filtfilt(&vec![0.0; pad]),
            Err(SpectralError::DegenerateSignal(_))
        ));
    }
}
