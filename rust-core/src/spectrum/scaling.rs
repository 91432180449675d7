//! Display scaling of power matrices

use super::estimator::NEGATIVE_POWER_FLOOR;
use crate::error::{Result, SpectralError};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a power matrix is prepared for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScalingMethod {
    /// Natural log, then values below the threshold are raised to it
    #[serde(rename = "old")]
    Threshold,
    /// Natural log only
    #[serde(rename = "log_only")]
    LogOnly,
    /// Unchanged
    #[default]
    #[serde(rename = "raw", alias = "new")]
    Raw,
}

impl ScalingMethod {
    pub fn name(&self) -> &'static str {
        match self {
            ScalingMethod::Threshold => "old",
            ScalingMethod::LogOnly => "log_only",
            ScalingMethod::Raw => "raw",
        }
    }
}

impl fmt::Display for ScalingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScalingMethod {
    type Err = SpectralError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "old" | "threshold" => Ok(ScalingMethod::Threshold),
            "log_only" | "log" => Ok(ScalingMethod::LogOnly),
            "raw" | "new" | "none" => Ok(ScalingMethod::Raw),
            other => Err(SpectralError::InvalidInput(format!(
                "unknown power scaling method '{}'",
                other
            ))),
        }
    }
}

/// Scaled matrix plus the range a colormap needs
#[derive(Debug, Clone)]
pub struct ScaledPower {
    pub power: Array2<f64>,
    /// Largest value after the log step (or of the raw matrix)
    pub max: f64,
    /// Smallest value after the log step, before any clipping
    pub min: f64,
    /// Floor actually applied; `None` unless the method clips
    pub threshold: Option<f64>,
}

/// Scale a non-negative power matrix for display
pub fn scale(power: &Array2<f64>, threshold: f64, method: ScalingMethod) -> Result<ScaledPower> {
    if power.is_empty() {
        return Err(SpectralError::InvalidInput("power matrix is empty".to_string()));
    }
    if power.iter().any(|p| !p.is_finite()) {
        return Err(SpectralError::InvalidInput(
            "power matrix contains non-finite values".to_string(),
        ));
    }

    let mut scaled = match method {
        ScalingMethod::Raw => power.clone(),
        ScalingMethod::Threshold | ScalingMethod::LogOnly => log_power(power),
    };
    let (min, max) = value_range(&scaled);

    let threshold = match method {
        ScalingMethod::Threshold => {
            if !threshold.is_finite() {
                return Err(SpectralError::InvalidInput(format!(
                    "log-power threshold must be finite, got {}",
                    threshold
                )));
            }
            scaled.mapv_inplace(|v| if v < threshold { threshold } else { v });
            Some(threshold)
        }
        _ => None,
    };

    log::debug!(
        "[Scaler] method={} max={:.3} min={:.3} threshold={:?}",
        method,
        max,
        min,
        threshold
    );

    Ok(ScaledPower {
        power: scaled,
        max,
        min,
        threshold,
    })
}

/// Natural log with values floored at the negative-power clamp
fn log_power(power: &Array2<f64>) -> Array2<f64> {
    power.mapv(|p| p.max(NEGATIVE_POWER_FLOOR).ln())
}

fn value_range(matrix: &Array2<f64>) -> (f64, f64) {
    matrix
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_raw_is_unchanged() {
        let power = array![[1.0, 2.0], [0.5, 8.0]];
        let scaled = scale(&power, -3.0, ScalingMethod::Raw).unwrap();
        assert_eq!(scaled.power, power);
        assert_eq!(scaled.max, 8.0);
        assert_eq!(scaled.min, 0.5);
        assert_eq!(scaled.threshold, None);
    }

    #[test]
    fn test_log_only() {
        let e = std::f64::consts::E;
        let power = array![[1.0, e], [e * e, 1.0]];
        let scaled = scale(&power, 0.0, ScalingMethod::LogOnly).unwrap();
        assert!((scaled.power[[0, 1]] - 1.0).abs() < 1e-12);
        assert!((scaled.max - 2.0).abs() < 1e-12);
        assert!(scaled.min.abs() < 1e-12);
        assert_eq!(scaled.threshold, None);
    }

    #[test]
    fn test_threshold_floors_log_power() {
        let power = array![[1e-10, 1.0], [1e-3, 10.0]];
        let scaled = scale(&power, -10.0, ScalingMethod::Threshold).unwrap();

        assert_eq!(scaled.threshold, Some(-10.0));
        assert!(scaled.power.iter().all(|&v| v >= -10.0));
        assert_eq!(scaled.power[[0, 0]], -10.0);
        // Range is taken before clipping
        assert!((scaled.min - 1e-10f64.ln()).abs() < 1e-9);
        assert!((scaled.max - 10f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_log_of_zero_stays_finite() {
        let power = array![[0.0, 1.0]];
        let scaled = scale(&power, -50.0, ScalingMethod::LogOnly).unwrap();
        assert!(scaled.power.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_method_names() {
        assert_eq!("old".parse::<ScalingMethod>().unwrap(), ScalingMethod::Threshold);
        assert_eq!("log_only".parse::<ScalingMethod>().unwrap(), ScalingMethod::LogOnly);
        assert_eq!("raw".parse::<ScalingMethod>().unwrap(), ScalingMethod::Raw);
        assert_eq!("new".parse::<ScalingMethod>().unwrap(), ScalingMethod::Raw);
        assert!("cubic".parse::<ScalingMethod>().is_err());
        assert_eq!(ScalingMethod::default(), ScalingMethod::Raw);
        assert_eq!(ScalingMethod::LogOnly.to_string(), "log_only");
    }
}
