//! Ensemble-averaged periodograms and spectrograms
//!
//! Every row of the (points × time steps) matrix is estimated independently on
//! one shared frequency/time grid and the estimates are averaged. Rows are
//! reduced in fixed-size chunks, each chunk summed in row order and the chunk
//! sums added in chunk order, so results do not depend on the thread count.

use super::fft::FftEngine;
use super::interpolate::{linspace, resample_time_axis};
use super::windowing::{detrend_and_window, fold_one_sided, PowerScaling};
use crate::error::{Result, SpectralError};
use crate::filters::windows::{generate_window, WindowType};
use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;

/// Floor written over negative power values
pub const NEGATIVE_POWER_FLOOR: f64 = 1e-16;

/// Rows summed sequentially before the ordered cross-chunk reduction
const REDUCTION_CHUNK: usize = 64;

/// Sampling constants of a fixed-length record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingConstants {
    /// Record duration T = end_t - start_t (s)
    pub period: f64,
    /// Samples per record
    pub n_samples: usize,
    /// Sample rate n/T (Hz)
    pub fs: f64,
}

impl SamplingConstants {
    /// Derive the sample rate from the number of time steps in [start_t, end_t]
    pub fn from_window(n_timesteps: usize, start_t: f64, end_t: f64) -> Result<Self> {
        let period = end_t - start_t;
        if !(period.is_finite() && period > 0.0) {
            return Err(SpectralError::DegenerateSignal(format!(
                "time window [{}, {}] is empty",
                start_t, end_t
            )));
        }
        if n_timesteps == 0 {
            return Err(SpectralError::DegenerateSignal(
                "record has no time steps".to_string(),
            ));
        }

        Ok(Self {
            period,
            n_samples: n_timesteps,
            fs: n_timesteps as f64 / period,
        })
    }

    /// Warn when an expected sample rate disagrees with the derived one
    pub fn check_rate(&self, expected_fs: f64) -> bool {
        let consistent = (self.fs - expected_fs).abs() <= 1e-6 * expected_fs.abs().max(1.0);
        if !consistent {
            log::warn!(
                "[Sampling] derived sample rate {} Hz differs from expected {} Hz; time steps may be unevenly spaced",
                self.fs,
                expected_fs
            );
        }
        consistent
    }
}

/// Segment length: next power of two ≥ n_timesteps / windows_per_record
pub fn segment_length(n_timesteps: usize, windows_per_record: usize) -> Result<usize> {
    if windows_per_record == 0 {
        return Err(SpectralError::DegenerateSignal(
            "at least one window per record is required".to_string(),
        ));
    }
    let raw = n_timesteps / windows_per_record;
    if raw == 0 {
        return Err(SpectralError::DegenerateSignal(format!(
            "{} time steps cannot be split into {} windows",
            n_timesteps, windows_per_record
        )));
    }
    Ok(raw.next_power_of_two())
}

/// Spectrogram parameters
#[derive(Debug, Clone)]
pub struct SpectrogramParams {
    /// Number of windows the record is divided into
    pub windows_per_record: usize,
    /// Fraction of each segment shared with the next one, in [0, 1)
    pub overlap_fraction: f64,
    /// Segment window
    pub window: WindowType,
    /// Density or spectrum normalization
    pub scaling: PowerScaling,
    /// Optional resampling of the time axis
    pub interpolation: Option<TimeGrid>,
}

impl SpectrogramParams {
    /// Parameters from a window rate (windows per second) and record duration
    pub fn from_window_rate(windows_per_sec: f64, period: f64) -> Self {
        Self {
            windows_per_record: (windows_per_sec * period).round().max(0.0) as usize,
            ..Self::default()
        }
    }
}

impl Default for SpectrogramParams {
    fn default() -> Self {
        Self {
            windows_per_record: 10,
            overlap_fraction: 0.75,
            window: WindowType::BlackmanHarris,
            scaling: PowerScaling::Spectrum,
            interpolation: None,
        }
    }
}

/// Uniform display grid over [start_t, end_t]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeGrid {
    pub start_t: f64,
    pub end_t: f64,
    pub bins: usize,
}

/// Averaged periodogram
#[derive(Debug, Clone)]
pub struct Periodogram {
    /// Frequency axis (Hz)
    pub freqs: Vec<f64>,
    /// Mean power per frequency bin
    pub power: Vec<f64>,
}

/// Averaged spectrogram
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// Frequency axis (Hz), n_freq_bins entries
    pub freqs: Vec<f64>,
    /// Time axis (s), segment centres or the interpolation grid
    pub times: Vec<f64>,
    /// Mean power, shape (n_freq_bins, n_time_bins)
    pub power: Array2<f64>,
    /// FFT length used per segment (2 × segment length)
    pub nfft: usize,
    /// Sample rate (Hz)
    pub fs: f64,
}

/// Segment geometry and precomputed window for one estimate
struct SegmentPlan {
    nperseg: usize,
    step: usize,
    n_segments: usize,
    window: Vec<f64>,
    scale: f64,
}

impl SegmentPlan {
    fn new(
        n_timesteps: usize,
        nperseg: usize,
        noverlap: usize,
        window: WindowType,
        scaling: PowerScaling,
        fs: f64,
    ) -> Self {
        let step = nperseg - noverlap;
        let window = generate_window(window, nperseg);
        let scale = scaling.factor(&window, fs);
        Self {
            nperseg,
            step,
            n_segments: (n_timesteps - noverlap) / step,
            window,
            scale,
        }
    }

    /// (n_freq_bins × n_segments) one-sided power of one row
    fn estimate(&self, engine: &mut FftEngine, row: &[f64]) -> Result<Array2<f64>> {
        let mut estimate = Array2::zeros((engine.num_bins(), self.n_segments));
        let mut buffer = vec![0.0; self.nperseg];

        for (i, mut column) in estimate.axis_iter_mut(Axis(1)).enumerate() {
            let start = i * self.step;
            detrend_and_window(&row[start..start + self.nperseg], &self.window, &mut buffer);

            let mut power = engine.power(&buffer)?;
            fold_one_sided(&mut power, engine.fft_size());
            for (target, p) in column.iter_mut().zip(power) {
                *target = p * self.scale;
            }
        }
        Ok(estimate)
    }

    fn segment_centres(&self, fs: f64) -> Vec<f64> {
        (0..self.n_segments)
            .map(|i| (self.nperseg as f64 / 2.0 + (i * self.step) as f64) / fs)
            .collect()
    }
}

fn validate_matrix(matrix: &ArrayView2<'_, f64>, fs: f64) -> Result<()> {
    if matrix.nrows() == 0 {
        return Err(SpectralError::InvalidInput(
            "time-series matrix has no rows".to_string(),
        ));
    }
    if matrix.ncols() == 0 {
        return Err(SpectralError::DegenerateSignal(
            "time-series matrix has no time steps".to_string(),
        ));
    }
    if !(fs.is_finite() && fs > 0.0) {
        return Err(SpectralError::InvalidInput(format!(
            "sample rate must be positive, got {}",
            fs
        )));
    }
    Ok(())
}

/// Estimate every row and average, or return the single row's estimate as is
fn ensemble_mean(
    matrix: &ArrayView2<'_, f64>,
    engine: &FftEngine,
    plan: &SegmentPlan,
) -> Result<Array2<f64>> {
    let n_rows = matrix.nrows();
    let row_estimate = |engine: &mut FftEngine, r: usize| -> Result<Array2<f64>> {
        let row = matrix.row(r);
        match row.as_slice() {
            Some(slice) => plan.estimate(engine, slice),
            None => plan.estimate(engine, &row.to_vec()),
        }
    };

    if n_rows == 1 {
        return row_estimate(&mut engine.clone(), 0);
    }

    let n_chunks = (n_rows + REDUCTION_CHUNK - 1) / REDUCTION_CHUNK;
    let partials: Vec<Array2<f64>> = (0..n_chunks)
        .into_par_iter()
        .map_init(
            || engine.clone(),
            |engine, chunk| {
                let start = chunk * REDUCTION_CHUNK;
                let end = (start + REDUCTION_CHUNK).min(n_rows);
                let mut acc = row_estimate(engine, start)?;
                for r in start + 1..end {
                    acc += &row_estimate(engine, r)?;
                }
                Ok(acc)
            },
        )
        .collect::<Result<_>>()?;

    let mut total = partials
        .into_iter()
        .reduce(|acc, partial| acc + partial)
        .ok_or_else(|| SpectralError::InvalidInput("no rows to average".to_string()))?;
    total /= n_rows as f64;
    Ok(total)
}

/// Replace negative entries with the floor value, returning how many changed
fn clamp_negative(power: &mut Array2<f64>, stage: &str) -> usize {
    let mut clamped = 0;
    power.mapv_inplace(|p| {
        if p < 0.0 {
            clamped += 1;
            NEGATIVE_POWER_FLOOR
        } else {
            p
        }
    });
    if clamped > 0 {
        log::warn!(
            "[{}] clamped {} negative power values to {:e}",
            stage,
            clamped,
            NEGATIVE_POWER_FLOOR
        );
    }
    clamped
}

/// Mean periodogram across rows (whole record per row, no segmentation)
pub fn periodogram(
    matrix: ArrayView2<'_, f64>,
    fs: f64,
    window: WindowType,
    scaling: PowerScaling,
) -> Result<Periodogram> {
    validate_matrix(&matrix, fs)?;

    let n = matrix.ncols();
    let engine = FftEngine::new(n);
    let plan = SegmentPlan::new(n, n, 0, window, scaling, fs);

    let mut mean = ensemble_mean(&matrix, &engine, &plan)?;
    clamp_negative(&mut mean, "Periodogram");

    Ok(Periodogram {
        freqs: engine.frequency_axis(fs),
        power: mean.column(0).to_vec(),
    })
}

/// Mean spectrogram across rows
pub fn spectrogram(
    matrix: ArrayView2<'_, f64>,
    fs: f64,
    params: &SpectrogramParams,
) -> Result<Spectrogram> {
    validate_matrix(&matrix, fs)?;
    if !(0.0..1.0).contains(&params.overlap_fraction) {
        return Err(SpectralError::InvalidInput(format!(
            "overlap fraction must be in [0, 1), got {}",
            params.overlap_fraction
        )));
    }

    let n = matrix.ncols();
    let seg_len = segment_length(n, params.windows_per_record)?;
    let nfft = 2 * seg_len;

    let nperseg = if seg_len > n {
        log::warn!(
            "[Spectrogram] segment length {} exceeds record length {}; using {}",
            seg_len,
            n,
            n
        );
        n
    } else {
        seg_len
    };
    let noverlap = (params.overlap_fraction * nperseg as f64).floor() as usize;

    let engine = FftEngine::new(nfft);
    let plan = SegmentPlan::new(n, nperseg, noverlap, params.window, params.scaling, fs);
    log::debug!(
        "[Spectrogram] {} rows, nperseg={}, noverlap={}, nfft={}, segments={}",
        matrix.nrows(),
        nperseg,
        noverlap,
        nfft,
        plan.n_segments
    );

    let mut power = ensemble_mean(&matrix, &engine, &plan)?;
    let mut times = plan.segment_centres(fs);

    if let Some(grid) = params.interpolation {
        let new_times = linspace(grid.start_t, grid.end_t, grid.bins);
        power = resample_time_axis(&power, &times, &new_times)?;
        times = new_times;
    }

    clamp_negative(&mut power, "Spectrogram");

    Ok(Spectrogram {
        freqs: engine.frequency_axis(fs),
        times,
        power,
        nfft,
        fs,
    })
}

impl Spectrogram {
    fn same_grid(&self, other: &Spectrogram) -> bool {
        self.power.dim() == other.power.dim()
            && self.nfft == other.nfft
            && self.freqs.len() == other.freqs.len()
            && self.times.len() == other.times.len()
            && self
                .times
                .iter()
                .zip(&other.times)
                .all(|(a, b)| (a - b).abs() <= 1e-9 * a.abs().max(1.0))
    }

    /// Frequency (Hz) of the strongest bin in every time column
    pub fn peak_frequencies(&self) -> Vec<f64> {
        self.power
            .axis_iter(Axis(1))
            .map(|column| {
                let (bin, _) = column.iter().enumerate().fold(
                    (0, f64::NEG_INFINITY),
                    |best, (k, &p)| if p > best.1 { (k, p) } else { best },
                );
                self.freqs[bin]
            })
            .collect()
    }
}

/// Average spectrograms computed on the same grid (e.g. x/y/z components)
pub fn combine_spectrograms(parts: &[Spectrogram]) -> Result<Spectrogram> {
    let (first, rest) = parts
        .split_first()
        .ok_or_else(|| SpectralError::InvalidInput("no spectrograms to combine".to_string()))?;

    let mut combined = first.clone();
    for part in rest {
        if !first.same_grid(part) {
            return Err(SpectralError::InvalidInput(
                "spectrograms are not on the same frequency/time grid".to_string(),
            ));
        }
        combined.power += &part.power;
    }
    combined.power /= parts.len() as f64;
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::f64::consts::PI;

    fn sine_matrix(rows: usize, n: usize, freq: f64, fs: f64) -> Array2<f64> {
        Array2::from_shape_fn((rows, n), |(_, i)| (2.0 * PI * freq * i as f64 / fs).sin())
    }

    #[test]
    fn test_segment_length() {
        assert_eq!(segment_length(10000, 40).unwrap(), 256);
        assert_eq!(segment_length(1024, 4).unwrap(), 256);
        assert_eq!(segment_length(5, 5).unwrap(), 1);
        assert!(matches!(segment_length(3, 5), Err(SpectralError::DegenerateSignal(_))));
        assert!(matches!(segment_length(3, 0), Err(SpectralError::DegenerateSignal(_))));
    }

    #[test]
    fn test_sampling_constants() {
        let c = SamplingConstants::from_window(10000, 0.0, 4.0).unwrap();
        assert_eq!(c.fs, 2500.0);
        assert_eq!(c.period, 4.0);
        assert!(c.check_rate(2500.0));
        assert!(!c.check_rate(2000.0));
        assert!(SamplingConstants::from_window(100, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_spectrogram_grid() {
        let fs = 1000.0;
        let matrix = sine_matrix(1, 1000, 100.0, fs);
        let params = SpectrogramParams {
            windows_per_record: 8,
            overlap_fraction: 0.5,
            ..Default::default()
        };

        let spec = spectrogram(matrix.view(), fs, &params).unwrap();
        // 1000/8 = 125 → 128 samples per segment, 256-point FFT
        assert_eq!(spec.nfft, 256);
        assert_eq!(spec.freqs.len(), 129);
        // (1000 - 64) / 64 segments
        assert_eq!(spec.times.len(), 14);
        assert!((spec.times[0] - 0.064).abs() < 1e-12);
        assert!((spec.times[1] - spec.times[0] - 0.064).abs() < 1e-12);
        assert_eq!(spec.power.dim(), (129, 14));
    }

    #[test]
    fn test_identical_rows_average_to_single_row() {
        let fs = 500.0;
        let single = sine_matrix(1, 2000, 40.0, fs);
        let many = sine_matrix(70, 2000, 40.0, fs);
        let params = SpectrogramParams {
            windows_per_record: 10,
            ..Default::default()
        };

        let a = spectrogram(single.view(), fs, &params).unwrap();
        let b = spectrogram(many.view(), fs, &params).unwrap();
        assert_eq!(a.power.dim(), b.power.dim());
        for (x, y) in a.power.iter().zip(b.power.iter()) {
            assert!((x - y).abs() <= 1e-12 * x.abs().max(1e-12), "{} vs {}", x, y);
        }

        let pa = periodogram(single.view(), fs, WindowType::BlackmanHarris, PowerScaling::Density).unwrap();
        let pb = periodogram(many.view(), fs, WindowType::BlackmanHarris, PowerScaling::Density).unwrap();
        for (x, y) in pa.power.iter().zip(pb.power.iter()) {
            assert!((x - y).abs() <= 1e-12 * x.abs().max(1e-12));
        }
    }

    #[test]
    fn test_average_of_different_rows() {
        let fs = 500.0;
        let mut matrix = sine_matrix(2, 1000, 50.0, fs);
        matrix.row_mut(1).mapv_inplace(|v| 3.0 * v);

        let mean = periodogram(matrix.view(), fs, WindowType::Hann, PowerScaling::Spectrum).unwrap();
        let first = periodogram(matrix.slice(ndarray::s![0..1, ..]), fs, WindowType::Hann, PowerScaling::Spectrum).unwrap();

        // (1 + 9) / 2 = 5 times the power of the unit-amplitude row
        let peak = 100;
        assert!((mean.power[peak] / first.power[peak] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_periodogram_spectrum_scaling_amplitude() {
        // Spectrum scaling of a unit sine on an exact bin gives A²/2 in that bin
        let fs = 1000.0;
        let matrix = sine_matrix(1, 1000, 125.0, fs);
        let p = periodogram(matrix.view(), fs, WindowType::Rectangular, PowerScaling::Spectrum).unwrap();

        assert_eq!(p.freqs.len(), 501);
        assert!((p.freqs[125] - 125.0).abs() < 1e-12);
        assert!((p.power[125] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_power_is_non_negative() {
        let fs = 200.0;
        let matrix = Array2::from_shape_fn((5, 800), |(r, i)| {
            ((i * 7 + r * 13) % 17) as f64 - 8.0
        });
        let params = SpectrogramParams {
            windows_per_record: 8,
            interpolation: Some(TimeGrid { start_t: 0.0, end_t: 4.0, bins: 50 }),
            ..Default::default()
        };
        let spec = spectrogram(matrix.view(), fs, &params).unwrap();
        assert_eq!(spec.times.len(), 50);
        assert!(spec.power.iter().all(|&p| p >= 0.0));
    }

    #[test]
    fn test_clamp_negative_uses_floor() {
        let mut power = ndarray::array![[0.5, -1e-3, 0.0], [-2.0, 3.0, -0.0]];
        assert_eq!(clamp_negative(&mut power, "test"), 2);
        assert_eq!(power[[0, 1]], NEGATIVE_POWER_FLOOR);
        assert_eq!(power[[1, 0]], NEGATIVE_POWER_FLOOR);
        assert_eq!(power[[0, 0]], 0.5);
        assert_eq!(power[[1, 1]], 3.0);
        assert_eq!(power[[0, 2]], 0.0);

        assert_eq!(clamp_negative(&mut power, "test"), 0);
    }

    #[test]
    fn test_spline_overshoot_is_floored() {
        // One burst segment between silent ones; the spline through the
        // isolated peak dips below zero next to it
        let fs = 1024.0;
        let matrix = Array2::from_shape_fn((3, 1024), |(_, i)| {
            if (384..512).contains(&i) {
                (2.0 * PI * 64.0 * i as f64 / fs).sin()
            } else {
                0.0
            }
        });
        let base = SpectrogramParams {
            windows_per_record: 8,
            overlap_fraction: 0.0,
            ..Default::default()
        };
        let raw = spectrogram(matrix.view(), fs, &base).unwrap();
        assert_eq!(raw.times.len(), 8);
        assert!(raw.power.column(2).iter().all(|&p| p == 0.0));

        let grid = TimeGrid {
            start_t: raw.times[0],
            end_t: raw.times[7],
            bins: 200,
        };
        let new_times = linspace(grid.start_t, grid.end_t, grid.bins);
        let resampled = resample_time_axis(&raw.power, &raw.times, &new_times).unwrap();
        assert!(resampled.iter().any(|&p| p < 0.0));

        let params = SpectrogramParams {
            interpolation: Some(grid),
            ..base
        };
        let spec = spectrogram(matrix.view(), fs, &params).unwrap();
        assert_eq!(spec.times.len(), 200);
        assert!(spec.power.iter().all(|&p| p >= 0.0));
        assert!(spec.power.iter().any(|&p| p == NEGATIVE_POWER_FLOOR));
        for (clamped, interpolated) in spec.power.iter().zip(resampled.iter()) {
            if *interpolated < 0.0 {
                assert_eq!(*clamped, NEGATIVE_POWER_FLOOR);
            } else {
                assert_eq!(clamped, interpolated);
            }
        }
    }

    #[test]
    fn test_degenerate_signal() {
        let matrix = Array2::<f64>::zeros((2, 3));
        let params = SpectrogramParams {
            windows_per_record: 5,
            ..Default::default()
        };
        assert!(matches!(
            spectrogram(matrix.view(), 100.0, &params),
            Err(SpectralError::DegenerateSignal(_))
        ));
    }

    #[test]
    fn test_combine_spectrograms() {
        let fs = 500.0;
        let params = SpectrogramParams::default();
        let a = spectrogram(sine_matrix(1, 1000, 50.0, fs).view(), fs, &params).unwrap();
        let b = spectrogram(sine_matrix(1, 1000, 120.0, fs).view(), fs, &params).unwrap();

        let combined = combine_spectrograms(&[a.clone(), b.clone()]).unwrap();
        let expected = (&a.power + &b.power) / 2.0;
        for (x, y) in combined.power.iter().zip(expected.iter()) {
            assert!((x - y).abs() < 1e-15);
        }

        let other = spectrogram(
            sine_matrix(1, 2000, 50.0, fs).view(),
            fs,
            &SpectrogramParams::default(),
        )
        .unwrap();
        assert!(combine_spectrograms(&[a, other]).is_err());
        assert!(combine_spectrograms(&[]).is_err());
    }
}
