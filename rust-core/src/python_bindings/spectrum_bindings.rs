//! Python bindings for ensemble spectral estimation

use numpy::{PyArray1, PyArray2, PyReadonlyArray2};
use pyo3::prelude::*;

use crate::filters::WindowType;
use crate::spectrum::{self, PowerScaling, ScalingMethod, SpectrogramParams, TimeGrid};

/// Mean periodogram across rows
///
/// Returns:
///     (freqs, power) as numpy arrays
#[pyfunction]
#[pyo3(signature = (matrix, fs, window="blackmanharris", scaling="density"))]
pub fn periodogram<'py>(
    py: Python<'py>,
    matrix: PyReadonlyArray2<'py, f64>,
    fs: f64,
    window: &str,
    scaling: &str,
) -> PyResult<(&'py PyArray1<f64>, &'py PyArray1<f64>)> {
    let result = spectrum::periodogram(
        matrix.as_array(),
        fs,
        window.parse::<WindowType>()?,
        scaling.parse::<PowerScaling>()?,
    )?;
    Ok((
        PyArray1::from_vec(py, result.freqs),
        PyArray1::from_vec(py, result.power),
    ))
}

/// Mean spectrogram across rows
///
/// Args:
///     matrix: Time series, one row per node
///     fs: Sample rate (Hz)
///     windows_per_record: Number of segments the record is split into
///     overlap: Fraction of each segment shared with the next
///     window: Segment window name
///     scaling: "density" or "spectrum"
///     time_grid: Optional (start_t, end_t, bins) to resample the time axis
///
/// Returns:
///     (freqs, times, power) with power shaped (n_freqs, n_times)
#[pyfunction]
#[pyo3(signature = (matrix, fs, windows_per_record=10, overlap=0.75, window="blackmanharris", scaling="spectrum", time_grid=None))]
#[allow(clippy::too_many_arguments, clippy::type_complexity)]
pub fn spectrogram<'py>(
    py: Python<'py>,
    matrix: PyReadonlyArray2<'py, f64>,
    fs: f64,
    windows_per_record: usize,
    overlap: f64,
    window: &str,
    scaling: &str,
    time_grid: Option<(f64, f64, usize)>,
) -> PyResult<(&'py PyArray1<f64>, &'py PyArray1<f64>, &'py PyArray2<f64>)> {
    let params = SpectrogramParams {
        windows_per_record,
        overlap_fraction: overlap,
        window: window.parse::<WindowType>()?,
        scaling: scaling.parse::<PowerScaling>()?,
        interpolation: time_grid.map(|(start_t, end_t, bins)| TimeGrid {
            start_t,
            end_t,
            bins,
        }),
    };
    let result = spectrum::spectrogram(matrix.as_array(), fs, &params)?;
    Ok((
        PyArray1::from_vec(py, result.freqs),
        PyArray1::from_vec(py, result.times),
        PyArray2::from_owned_array(py, result.power),
    ))
}

/// Display scaling of a power matrix
///
/// Returns:
///     (scaled power, max, min) where max and min are taken before clipping
#[pyfunction]
#[pyo3(signature = (power, threshold, method="raw"))]
pub fn scale_power<'py>(
    py: Python<'py>,
    power: PyReadonlyArray2<'py, f64>,
    threshold: f64,
    method: &str,
) -> PyResult<(&'py PyArray2<f64>, f64, f64)> {
    let scaled = spectrum::scale(
        &power.as_array().to_owned(),
        threshold,
        method.parse::<ScalingMethod>()?,
    )?;
    Ok((
        PyArray2::from_owned_array(py, scaled.power),
        scaled.max,
        scaled.min,
    ))
}
