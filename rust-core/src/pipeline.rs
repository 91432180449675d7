//! One analysis request end to end
//!
//! region → sample indices → (optional) conditioning → ensemble spectrogram →
//! display scaling → chroma → periodicity. Nothing computed for one request is
//! reused by the next apart from cached chroma filterbanks.

use crate::chroma::{normalize_chroma, periodicity, project, ChromaNorm, ChromaProjector, Periodicity};
use crate::config::AnalysisConfig;
use crate::error::{Result, SpectralError};
use crate::filters::filter_rows;
use crate::sampling::{
    sample, sampling_rng, select_region, NodeDomains, Point3, Quantity, RegionDescriptor,
    RegionTarget, SamplingMethod,
};
use crate::spectrum::{
    scale, spectrogram, SamplingConstants, ScaledPower, Spectrogram, SpectrogramParams,
    SpectrogramTable, TimeGrid,
};
use ndarray::{Array2, ArrayView2, Axis};

/// Inputs supplied by the mesh/simulation-output layer
pub struct AnalysisRequest<'a> {
    /// Coordinates of every node
    pub coords: &'a [Point3],
    pub domains: &'a NodeDomains,
    pub region: RegionDescriptor,
    pub quantity: Quantity,
    /// Restrict to nodes shared by the fluid and solid domains
    pub interface_only: bool,
    pub method: SamplingMethod<'a>,
    /// Time series of every node, shape (n_nodes × n_timesteps)
    pub series: ArrayView2<'a, f64>,
    pub start_t: f64,
    pub end_t: f64,
    /// Sample rate the solver was run at, when known
    pub expected_fs: Option<f64>,
}

/// Everything a plotting or export collaborator needs
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub quantity: Quantity,
    /// Sampled node indices, in draw order
    pub sample_indices: Vec<usize>,
    pub sampling: SamplingConstants,
    /// False when the derived sample rate disagrees with the expected one
    pub rate_consistent: bool,
    /// Unscaled ensemble spectrogram
    pub spectrogram: Spectrogram,
    pub scaled: ScaledPower,
    /// Configured (floor, maximum) colour range for the quantity
    pub display_range: (f64, f64),
    /// Chroma matrix with the configured column normalization
    pub chroma: Array2<f64>,
    pub periodicity: Periodicity,
}

impl AnalysisReport {
    /// Scaled spectrogram in the CSV table layout
    pub fn scaled_table(&self) -> Result<SpectrogramTable> {
        SpectrogramTable::with_power(&self.spectrogram, self.scaled.power.clone())
    }
}

/// Analysis runner holding the configuration and the filterbank cache
pub struct Analysis {
    config: AnalysisConfig,
    projector: ChromaProjector,
}

impl Analysis {
    pub fn new(config: AnalysisConfig) -> Self {
        let projector = ChromaProjector::new(config.chroma.clone());
        Self { config, projector }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn run(&mut self, request: &AnalysisRequest<'_>) -> Result<AnalysisReport> {
        let config = &self.config;
        if request.coords.len() != request.series.nrows() {
            return Err(SpectralError::InvalidInput(format!(
                "{} node coordinates but {} time series",
                request.coords.len(),
                request.series.nrows()
            )));
        }

        let target = RegionTarget::for_quantity(request.quantity, request.interface_only);
        let eligible = select_region(request.coords, &request.region, request.domains, target)?;

        let mut rng = sampling_rng(config.seed);
        let sample_indices = sample(&eligible, config.n_samples, &request.method, &mut rng)?;
        log::info!(
            "[Analysis] {} samples of '{}' from {} eligible nodes",
            sample_indices.len(),
            request.quantity,
            eligible.len()
        );

        let sampling =
            SamplingConstants::from_window(request.series.ncols(), request.start_t, request.end_t)?;
        let rate_consistent = request
            .expected_fs
            .map_or(true, |expected| sampling.check_rate(expected));
        let mut matrix = request.series.select(Axis(0), &sample_indices);

        if config.filter.enabled {
            matrix = filter_rows(matrix.view(), &config.filter.spec(sampling.fs))?;
        }

        let params = SpectrogramParams {
            overlap_fraction: config.overlap_frac,
            window: config.window,
            scaling: config.scaling,
            interpolation: config.interpolate.then_some(TimeGrid {
                start_t: request.start_t,
                end_t: request.end_t,
                bins: config.interpolation_bins,
            }),
            ..SpectrogramParams::from_window_rate(config.windows_per_sec, sampling.period)
        };
        let spectrogram = spectrogram(matrix.view(), sampling.fs, &params)?;

        let threshold = config.thresholds.for_quantity(request.quantity);
        let scaled = scale(&spectrogram.power, threshold, config.power_scaling)?;

        let filterbank = self.projector.filterbank(spectrogram.fs, spectrogram.nfft)?;
        let raw = project(&filterbank, &spectrogram.power, ChromaNorm::Raw)?;
        let (chroma, normalized) = match config.chroma_norm {
            ChromaNorm::Sum => {
                let normalized = normalize_chroma(raw, ChromaNorm::Sum)?;
                (normalized.clone(), normalized)
            }
            norm => (
                normalize_chroma(raw.clone(), norm)?,
                normalize_chroma(raw, ChromaNorm::Sum)?,
            ),
        };
        let periodicity = periodicity(normalized.view(), self.projector.params().n_chroma)?;
        log::info!(
            "[Analysis] mean periodicity {:.4} over {} time bins",
            periodicity.mean,
            periodicity.scores.len()
        );

        Ok(AnalysisReport {
            quantity: request.quantity,
            sample_indices,
            sampling,
            rate_consistent,
            display_range: config.display_range(request.quantity),
            spectrogram,
            scaled,
            chroma,
            periodicity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::{DomainTags, Sphere};
    use ndarray::Array2;
    use std::f64::consts::PI;

    #[test]
    fn test_run_on_synthetic_tone() {
        let fs = 1000.0;
        let n_nodes = 20;
        let coords: Vec<Point3> = (0..n_nodes).map(|i| [i as f64, 0.0, 0.0]).collect();
        let series = Array2::from_shape_fn((n_nodes, 2000), |(r, i)| {
            (2.0 * PI * 60.0 * i as f64 / fs + r as f64 * 0.1).sin()
        });
        let domains = NodeDomains::Volume(DomainTags::fluid_solid(0..n_nodes, 15..n_nodes));

        let config = AnalysisConfig {
            n_samples: 30,
            windows_per_sec: 5.0,
            seed: Some(5),
            ..Default::default()
        };
        let mut analysis = Analysis::new(config);
        let request = AnalysisRequest {
            coords: &coords,
            domains: &domains,
            region: RegionDescriptor::Sphere(Sphere::new([0.0; 3], 10.5)),
            quantity: Quantity::Velocity,
            interface_only: false,
            method: SamplingMethod::RandomPoint,
            series: series.view(),
            start_t: 0.0,
            end_t: 2.0,
            expected_fs: None,
        };

        let report = analysis.run(&request).unwrap();
        assert_eq!(report.sample_indices.len(), 30);
        assert!(report.sample_indices.iter().all(|&i| i <= 10));
        assert_eq!(report.sampling.fs, 1000.0);

        // 2000 / 10 windows → 256-sample segments, 512-point FFT
        assert_eq!(report.spectrogram.nfft, 512);
        for peak in report.spectrogram.peak_frequencies() {
            assert!((peak - 60.0).abs() <= fs / 512.0);
        }

        assert_eq!(report.chroma.nrows(), 12);
        assert_eq!(report.chroma.ncols(), report.spectrogram.times.len());
        assert!(report
            .periodicity
            .scores
            .iter()
            .all(|s| (0.0..=1.0).contains(s)));
        assert!(report.scaled_table().is_ok());

        // Same seed, same samples
        let again = analysis.run(&request).unwrap();
        assert_eq!(again.sample_indices, report.sample_indices);
    }

    #[test]
    fn test_run_rejects_mismatched_series() {
        let coords = vec![[0.0; 3]; 3];
        let series = Array2::<f64>::zeros((2, 100));
        let domains = NodeDomains::Surface;
        let mut analysis = Analysis::new(AnalysisConfig::default());
        let request = AnalysisRequest {
            coords: &coords,
            domains: &domains,
            region: RegionDescriptor::Sphere(Sphere::new([0.0; 3], 1.0)),
            quantity: Quantity::WallShearStress,
            interface_only: false,
            method: SamplingMethod::RandomPoint,
            series: series.view(),
            start_t: 0.0,
            end_t: 1.0,
            expected_fs: None,
        };
        assert!(matches!(
            analysis.run(&request),
            Err(SpectralError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rate_mismatch_and_max_chroma() {
        let fs = 1000.0;
        let n_nodes = 6;
        let coords: Vec<Point3> = (0..n_nodes).map(|i| [0.0, i as f64, 0.0]).collect();
        let series = Array2::from_shape_fn((n_nodes, 2000), |(_, i)| {
            (2.0 * PI * 220.0 * i as f64 / fs).sin()
        });
        let domains = NodeDomains::Surface;
        let request = AnalysisRequest {
            coords: &coords,
            domains: &domains,
            region: RegionDescriptor::Sphere(Sphere::new([0.0; 3], 50.0)),
            quantity: Quantity::WallShearStress,
            interface_only: false,
            method: SamplingMethod::RandomPoint,
            series: series.view(),
            start_t: 0.0,
            end_t: 2.0,
            expected_fs: Some(800.0),
        };

        let run_with = |chroma_norm| {
            let config = AnalysisConfig {
                n_samples: 12,
                seed: Some(8),
                chroma_norm,
                ..Default::default()
            };
            Analysis::new(config).run(&request).unwrap()
        };
        let max = run_with(ChromaNorm::Max);
        let sum = run_with(ChromaNorm::Sum);

        // A wrong expected rate is reported, not fatal
        assert!(!max.rate_consistent);
        for column in max.chroma.columns() {
            let peak = column.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            assert!((peak - 1.0).abs() < 1e-12);
        }
        for column in sum.chroma.columns() {
            assert!((column.sum() - 1.0).abs() < 1e-9);
        }
        assert_eq!(max.periodicity, sum.periodicity);

        let consistent = Analysis::new(AnalysisConfig {
            n_samples: 4,
            seed: Some(1),
            ..Default::default()
        })
        .run(&AnalysisRequest {
            expected_fs: Some(fs),
            ..request
        })
        .unwrap();
        assert!(consistent.rate_consistent);
    }
}
