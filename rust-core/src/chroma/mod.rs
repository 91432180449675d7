//! Chroma projection and periodicity scoring

pub mod entropy;
pub mod filterbank;
pub mod normalize;
pub mod projector;

pub use entropy::{entropy_score, mean_periodicity, periodicity, Periodicity};
pub use filterbank::{build_filterbank, frequency_to_octaves, octaves_to_frequency, ChromaParams};
pub use normalize::{normalize, FillPolicy, Norm};
pub use projector::{normalize_chroma, project, ChromaNorm, ChromaProjector};
