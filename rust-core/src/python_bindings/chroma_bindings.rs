//! Python bindings for chroma projection and periodicity

use numpy::{PyArray1, PyArray2, PyReadonlyArray2};
use pyo3::prelude::*;

use crate::chroma::{self, ChromaNorm, ChromaParams, ChromaProjector};

fn parse_norm(norm: &str) -> PyResult<ChromaNorm> {
    match norm.to_ascii_lowercase().as_str() {
        "max" => Ok(ChromaNorm::Max),
        "sum" => Ok(ChromaNorm::Sum),
        "raw" | "none" => Ok(ChromaNorm::Raw),
        other => Err(pyo3::exceptions::PyValueError::new_err(format!(
            "unknown chroma normalization '{}'",
            other
        ))),
    }
}

/// Chroma filterbank, shape (n_chroma, 1 + n_fft / 2)
#[pyfunction]
#[pyo3(signature = (sr, n_fft, n_chroma=12, tuning=0.0, base_c=true))]
pub fn chroma_filterbank<'py>(
    py: Python<'py>,
    sr: f64,
    n_fft: usize,
    n_chroma: usize,
    tuning: f64,
    base_c: bool,
) -> PyResult<&'py PyArray2<f64>> {
    let params = ChromaParams {
        n_chroma,
        tuning,
        base_c,
        ..Default::default()
    };
    let filterbank = chroma::build_filterbank(sr, n_fft, &params)?;
    Ok(PyArray2::from_owned_array(py, filterbank))
}

/// Per-column periodicity of a sum-normalized chroma matrix
///
/// Returns:
///     (scores, mean)
#[pyfunction]
#[pyo3(signature = (normalized, n_chroma=12))]
pub fn entropy_score<'py>(
    py: Python<'py>,
    normalized: PyReadonlyArray2<'py, f64>,
    n_chroma: usize,
) -> PyResult<(&'py PyArray1<f64>, f64)> {
    let result = chroma::periodicity(normalized.as_array(), n_chroma)?;
    Ok((PyArray1::from_vec(py, result.scores), result.mean))
}

/// Chroma projector with a filterbank cache keyed on (sr, n_fft)
#[pyclass(name = "ChromaProjector")]
pub struct PyChromaProjector {
    projector: ChromaProjector,
}

#[pymethods]
impl PyChromaProjector {
    #[new]
    #[pyo3(signature = (n_chroma=12, tuning=0.0, base_c=true))]
    fn new(n_chroma: usize, tuning: f64, base_c: bool) -> Self {
        Self {
            projector: ChromaProjector::new(ChromaParams {
                n_chroma,
                tuning,
                base_c,
                ..Default::default()
            }),
        }
    }

    /// Project a power spectrogram onto chroma classes
    ///
    /// Args:
    ///     power: Power matrix, shape (1 + n_fft / 2, n_times)
    ///     sr: Sample rate (Hz)
    ///     n_fft: FFT length the power was computed with
    ///     norm: "sum", "max" or "raw"
    #[pyo3(signature = (power, sr, n_fft, norm="sum"))]
    fn project<'py>(
        &mut self,
        py: Python<'py>,
        power: PyReadonlyArray2<'py, f64>,
        sr: f64,
        n_fft: usize,
        norm: &str,
    ) -> PyResult<&'py PyArray2<f64>> {
        let norm = parse_norm(norm)?;
        let filterbank = self.projector.filterbank(sr, n_fft)?;
        let projected = chroma::project(&filterbank, &power.as_array().to_owned(), norm)?;
        Ok(PyArray2::from_owned_array(py, projected))
    }

    /// Number of filterbanks built so far
    fn cached_filterbanks(&self) -> usize {
        self.projector.cached_filterbanks()
    }
}
