//! Spectral estimation, display scaling and export

pub mod estimator;
pub mod export;
pub mod fft;
pub mod interpolate;
pub mod scaling;
pub mod windowing;

pub use estimator::{
    combine_spectrograms, periodogram, segment_length, spectrogram, Periodogram,
    SamplingConstants, Spectrogram, SpectrogramParams, TimeGrid, NEGATIVE_POWER_FLOOR,
};
pub use export::SpectrogramTable;
pub use fft::FftEngine;
pub use interpolate::{linspace, resample_time_axis, CubicSpline};
pub use scaling::{scale, ScaledPower, ScalingMethod};
pub use windowing::PowerScaling;
