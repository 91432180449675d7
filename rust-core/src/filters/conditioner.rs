//! Row-wise signal conditioning of time-series matrices
//!
//! Rows are filtered independently (one row per sampled node) in parallel;
//! output row order always matches input row order.

use super::butterworth::{FilterSpec, SosFilter};
use crate::error::Result;
use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;

/// Zero-phase filter a single time series
pub fn filter_row(row: &[f64], spec: &FilterSpec) -> Result<Vec<f64>> {
    spec.design()?.filtfilt(row)
}

/// Zero-phase filter every row of a (points × time steps) matrix
pub fn filter_rows(matrix: ArrayView2<'_, f64>, spec: &FilterSpec) -> Result<Array2<f64>> {
    let filter = spec.design()?;
    log::debug!(
        "[Conditioner] {:?} filter order {} on {} rows",
        spec.mode,
        spec.order,
        matrix.nrows()
    );
    apply_rows(matrix, &filter)
}

/// Apply an already designed filter to every row
pub fn apply_rows(matrix: ArrayView2<'_, f64>, filter: &SosFilter) -> Result<Array2<f64>> {
    let rows: Vec<Vec<f64>> = (0..matrix.nrows())
        .into_par_iter()
        .map(|r| filter.filtfilt(&matrix.row(r).to_vec()))
        .collect::<Result<_>>()?;

    let mut output = Array2::zeros(matrix.raw_dim());
    for (mut target, row) in output.axis_iter_mut(Axis(0)).zip(rows) {
        target.assign(&ndarray::ArrayView1::from(&row[..]));
    }
    Ok(output)
}
