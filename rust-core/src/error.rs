//! Error taxonomy for the analysis pipeline
//!
//! Every variant is a local validation failure raised by the call that
//! detects it. None of them are retried.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpectralError {
    #[error("Invalid sampling region: {0}")]
    InvalidRegion(String),

    #[error("Sampling region contains no eligible nodes: {0}")]
    EmptyRegion(String),

    #[error("Invalid filter specification: {0}")]
    InvalidFilterSpec(String),

    #[error("Signal too short for the requested analysis: {0}")]
    DegenerateSignal(String),

    #[error("Invalid normalization: {0}")]
    InvalidNormSpec(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Malformed configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SpectralError>;
