//! PyO3 bindings for Python integration

use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;

use crate::error::SpectralError;

mod chroma_bindings;
mod filter_bindings;
mod spectrum_bindings;

impl From<SpectralError> for PyErr {
    fn from(err: SpectralError) -> Self {
        match err {
            SpectralError::Io(_) => PyIOError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

/// Python module definition
#[pymodule]
fn fsi_spectral(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(spectrum_bindings::periodogram, m)?)?;
    m.add_function(wrap_pyfunction!(spectrum_bindings::spectrogram, m)?)?;
    m.add_function(wrap_pyfunction!(spectrum_bindings::scale_power, m)?)?;
    m.add_function(wrap_pyfunction!(filter_bindings::butter_filter, m)?)?;
    m.add_function(wrap_pyfunction!(chroma_bindings::chroma_filterbank, m)?)?;
    m.add_function(wrap_pyfunction!(chroma_bindings::entropy_score, m)?)?;

    m.add_class::<chroma_bindings::PyChromaProjector>()?;

    Ok(())
}
