//! Python bindings for Butterworth conditioning

use numpy::{PyArray2, PyReadonlyArray2};
use pyo3::prelude::*;

use crate::filters::{filter_rows, FilterMode, FilterSpec};

/// Zero-phase Butterworth filter applied to every row
///
/// Args:
///     matrix: Time series, one row per node
///     fs: Sample rate (Hz)
///     lowcut: Low cutoff (Hz)
///     highcut: High cutoff (Hz)
///     order: Filter order
///     mode: "band", "stop", "highpass" or "lowpass"
///
/// Returns:
///     Filtered matrix with the input's shape
#[pyfunction]
#[pyo3(signature = (matrix, fs, lowcut=25.0, highcut=15000.0, order=6, mode="highpass"))]
pub fn butter_filter<'py>(
    py: Python<'py>,
    matrix: PyReadonlyArray2<'py, f64>,
    fs: f64,
    lowcut: f64,
    highcut: f64,
    order: usize,
    mode: &str,
) -> PyResult<&'py PyArray2<f64>> {
    let spec = FilterSpec {
        lowcut,
        highcut,
        fs,
        order,
        mode: mode.parse::<FilterMode>()?,
    };
    let filtered = filter_rows(matrix.as_array(), &spec)?;
    Ok(PyArray2::from_owned_array(py, filtered))
}
