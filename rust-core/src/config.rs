//! Analysis configuration
//!
//! Parameters that stay fixed across analysis requests, loaded from JSON.
//! Missing fields take their defaults, so a partial file only needs the
//! values it changes.

use crate::chroma::{ChromaNorm, ChromaParams};
use crate::error::Result;
use crate::filters::{FilterMode, FilterSpec, WindowType};
use crate::sampling::Quantity;
use crate::spectrum::{PowerScaling, ScalingMethod};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Fraction of each spectrogram segment shared with the next
    pub overlap_frac: f64,
    /// Segment window
    pub window: WindowType,
    /// Number of node samples per analysis
    pub n_samples: usize,
    /// Spectrogram windows per second of record
    pub windows_per_sec: f64,
    /// Time-series conditioning
    pub filter: FilterConfig,
    /// Log-power display floor per quantity
    pub thresholds: QuantityValues,
    /// Upper end of the display range per quantity
    pub max_plot: QuantityValues,
    /// Density or spectrum normalization
    pub scaling: PowerScaling,
    /// Display scaling of the power matrix
    pub power_scaling: ScalingMethod,
    /// Resample the time axis onto a uniform grid
    pub interpolate: bool,
    pub interpolation_bins: usize,
    pub chroma: ChromaParams,
    pub chroma_norm: ChromaNorm,
    /// Sampling seed; unseeded runs draw different nodes every time
    pub seed: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            overlap_frac: 0.75,
            window: WindowType::BlackmanHarris,
            n_samples: 10000,
            windows_per_sec: 4.0,
            filter: FilterConfig::default(),
            thresholds: QuantityValues {
                d: -42.0,
                v: -20.0,
                p: -5.0,
                wss: -18.0,
            },
            max_plot: QuantityValues {
                d: -30.0,
                v: -7.0,
                p: 5.0,
                wss: -6.0,
            },
            scaling: PowerScaling::Spectrum,
            power_scaling: ScalingMethod::Raw,
            interpolate: false,
            interpolation_bins: 100,
            chroma: ChromaParams::default(),
            chroma_norm: ChromaNorm::Sum,
            seed: None,
        }
    }
}

/// Butterworth conditioning applied before spectral estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub enabled: bool,
    pub mode: FilterMode,
    /// Low cutoff (Hz)
    pub lowcut: f64,
    /// High cutoff (Hz), used by two-sided and low-pass modes
    pub highcut: f64,
    pub order: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: FilterMode::Highpass,
            lowcut: 25.0,
            highcut: 15000.0,
            order: 6,
        }
    }
}

impl FilterConfig {
    /// Filter specification at a given sample rate
    pub fn spec(&self, fs: f64) -> FilterSpec {
        FilterSpec {
            lowcut: self.lowcut,
            highcut: self.highcut,
            fs,
            order: self.order,
            mode: self.mode,
        }
    }
}

/// One value per analysed quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantityValues {
    pub d: f64,
    pub v: f64,
    pub p: f64,
    pub wss: f64,
}

impl QuantityValues {
    pub fn for_quantity(&self, quantity: Quantity) -> f64 {
        match quantity {
            Quantity::Displacement => self.d,
            Quantity::Velocity => self.v,
            Quantity::Pressure => self.p,
            Quantity::WallShearStress => self.wss,
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load configuration from a JSON file
    ///
    /// Unlike a missing optional setting, an unreadable or malformed file is
    /// an error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(&path).map_err(|err| {
            log::warn!(
                "[Config] Failed to read config file {:?}: {}",
                path.as_ref(),
                err
            );
            err
        })?;
        let config = Self::from_json_str(&contents)?;
        log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
        Ok(config)
    }

    /// (log-power floor, display maximum) for a quantity
    pub fn display_range(&self, quantity: Quantity) -> (f64, f64) {
        (
            self.thresholds.for_quantity(quantity),
            self.max_plot.for_quantity(quantity),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpectralError;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.overlap_frac, 0.75);
        assert_eq!(config.window, WindowType::BlackmanHarris);
        assert_eq!(config.n_samples, 10000);
        assert_eq!(config.windows_per_sec, 4.0);
        assert_eq!(config.filter.lowcut, 25.0);
        assert_eq!(config.filter.order, 6);
        assert_eq!(config.power_scaling, ScalingMethod::Raw);
        assert_eq!(config.chroma.n_chroma, 12);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AnalysisConfig {
            seed: Some(17),
            power_scaling: ScalingMethod::Threshold,
            ..Default::default()
        };
        let json = config.to_json_string().unwrap();
        assert!(json.contains("\"blackmanharris\""));
        assert!(json.contains("\"old\""));

        let parsed = AnalysisConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "window": "hann",
            "n_samples": 500,
            "power_scaling": "log_only",
            "filter": { "enabled": true, "lowcut": 10.0 },
            "thresholds": { "d": -40, "v": -21, "p": -4, "wss": -17 }
        }"#;
        let config = AnalysisConfig::from_json_str(json).unwrap();

        assert_eq!(config.window, WindowType::Hann);
        assert_eq!(config.n_samples, 500);
        assert_eq!(config.power_scaling, ScalingMethod::LogOnly);
        assert!(config.filter.enabled);
        assert_eq!(config.filter.lowcut, 10.0);
        assert_eq!(config.filter.order, 6);
        assert_eq!(config.overlap_frac, 0.75);
        assert_eq!(config.thresholds.for_quantity(Quantity::Velocity), -21.0);
        assert_eq!(config.display_range(Quantity::Pressure), (-4.0, 5.0));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            AnalysisConfig::from_json_str("{ \"window\": \"triangle\" }"),
            Err(SpectralError::Config(_))
        ));
        assert!(matches!(
            AnalysisConfig::load_from_file("/nonexistent/analysis.json"),
            Err(SpectralError::Io(_))
        ));
    }
}
