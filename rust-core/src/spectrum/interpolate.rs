//! Cubic spline resampling of the spectrogram time axis
//!
//! A tensor-product interpolating spline evaluated on its own frequency knots
//! reduces to a 1-D spline along time for every frequency row, so resampling
//! only the time axis is done row by row with a not-a-knot cubic spline.
//! Queries outside the knot range evaluate at the nearest boundary knot.

use crate::error::{Result, SpectralError};
use ndarray::{Array2, ArrayView1};

/// Not-a-knot cubic spline through (x, y), stored as values and slopes
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    slopes: Vec<f64>,
}

impl CubicSpline {
    /// Fit a spline through at least four strictly increasing knots
    pub fn not_a_knot(x: &[f64], y: &[f64]) -> Result<Self> {
        let n = x.len();
        if n != y.len() {
            return Err(SpectralError::InvalidInput(format!(
                "spline knots ({}) and values ({}) differ in length",
                n,
                y.len()
            )));
        }
        if n < 4 {
            return Err(SpectralError::DegenerateSignal(format!(
                "cubic interpolation needs at least 4 time bins, got {}",
                n
            )));
        }

        let dx: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        if dx.iter().any(|&h| !(h > 0.0)) {
            return Err(SpectralError::InvalidInput(
                "spline knots must be strictly increasing".to_string(),
            ));
        }
        let secant: Vec<f64> = y
            .windows(2)
            .zip(&dx)
            .map(|(w, &h)| (w[1] - w[0]) / h)
            .collect();

        // Tridiagonal system for the slopes
        let mut lower = vec![0.0; n];
        let mut diag = vec![0.0; n];
        let mut upper = vec![0.0; n];
        let mut rhs = vec![0.0; n];

        let d = x[2] - x[0];
        diag[0] = dx[1];
        upper[0] = d;
        rhs[0] = ((dx[0] + 2.0 * d) * dx[1] * secant[0] + dx[0] * dx[0] * secant[1]) / d;

        for i in 1..n - 1 {
            lower[i] = dx[i];
            diag[i] = 2.0 * (dx[i - 1] + dx[i]);
            upper[i] = dx[i - 1];
            rhs[i] = 3.0 * (dx[i] * secant[i - 1] + dx[i - 1] * secant[i]);
        }

        let d = x[n - 1] - x[n - 3];
        lower[n - 1] = d;
        diag[n - 1] = dx[n - 3];
        rhs[n - 1] = (dx[n - 2] * dx[n - 2] * secant[n - 3]
            + (2.0 * d + dx[n - 2]) * dx[n - 3] * secant[n - 2])
            / d;

        let slopes = solve_tridiagonal(&lower, &diag, &upper, &rhs)?;

        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            slopes,
        })
    }

    /// Evaluate at `xq`, clamped to the knot range
    pub fn evaluate(&self, xq: f64) -> f64 {
        let n = self.x.len();
        let xq = xq.clamp(self.x[0], self.x[n - 1]);

        let i = match self.x.partition_point(|&knot| knot <= xq) {
            0 => 0,
            p => (p - 1).min(n - 2),
        };

        let h = self.x[i + 1] - self.x[i];
        let t = (xq - self.x[i]) / h;
        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        h00 * self.y[i] + h10 * h * self.slopes[i] + h01 * self.y[i + 1] + h11 * h * self.slopes[i + 1]
    }
}

/// Thomas algorithm; `lower[0]` and `upper[n-1]` are ignored
fn solve_tridiagonal(lower: &[f64], diag: &[f64], upper: &[f64], rhs: &[f64]) -> Result<Vec<f64>> {
    let n = diag.len();
    let mut c = vec![0.0; n];
    let mut d = vec![0.0; n];

    let mut pivot = diag[0];
    if pivot == 0.0 {
        return Err(SpectralError::InvalidInput("singular spline system".to_string()));
    }
    c[0] = upper[0] / pivot;
    d[0] = rhs[0] / pivot;

    for i in 1..n {
        pivot = diag[i] - lower[i] * c[i - 1];
        if pivot == 0.0 {
            return Err(SpectralError::InvalidInput("singular spline system".to_string()));
        }
        c[i] = if i + 1 < n { upper[i] / pivot } else { 0.0 };
        d[i] = (rhs[i] - lower[i] * d[i - 1]) / pivot;
    }

    let mut solution = vec![0.0; n];
    solution[n - 1] = d[n - 1];
    for i in (0..n - 1).rev() {
        solution[i] = d[i] - c[i] * solution[i + 1];
    }
    Ok(solution)
}

/// Evenly spaced grid of `count` points over [start, end]
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Resample every row of a (frequency × time) matrix onto `new_times`
pub fn resample_time_axis(
    power: &Array2<f64>,
    times: &[f64],
    new_times: &[f64],
) -> Result<Array2<f64>> {
    if power.ncols() != times.len() {
        return Err(SpectralError::InvalidInput(format!(
            "power matrix has {} time bins but axis has {}",
            power.ncols(),
            times.len()
        )));
    }

    let mut resampled = Array2::zeros((power.nrows(), new_times.len()));
    for (row, mut target) in power.rows().into_iter().zip(resampled.rows_mut()) {
        let spline = CubicSpline::not_a_knot(times, &row_values(row))?;
        for (value, &t) in target.iter_mut().zip(new_times) {
            *value = spline.evaluate(t);
        }
    }
    Ok(resampled)
}

fn row_values(row: ArrayView1<'_, f64>) -> Vec<f64> {
    row.iter().copied().collect()
}
