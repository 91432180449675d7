//! FSI Spectral - spectral diagnostics for fluid-structure interaction output
//!
//! Ensemble spectrograms of node time series sampled from a mesh region,
//! with optional Butterworth conditioning, display scaling, chroma
//! projection and entropy-based periodicity scoring. Python bindings are
//! built with the `python` feature.

// Suppress PyO3 non-local impl warnings (harmless macro-generated code)
#![cfg_attr(feature = "python", allow(non_local_definitions))]

pub mod chroma;
pub mod config;
pub mod error;
pub mod filters;
pub mod pipeline;
pub mod sampling;
pub mod spectrum;

#[cfg(feature = "python")]
pub mod python_bindings;

pub use config::AnalysisConfig;
pub use error::{Result, SpectralError};
pub use filters::{FilterMode, FilterSpec, WindowType};
pub use pipeline::{Analysis, AnalysisReport, AnalysisRequest};
pub use spectrum::{Spectrogram, SpectrogramParams, SpectrogramTable};
