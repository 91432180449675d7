//! Butterworth design and zero-phase conditioning of node time series

pub mod windows;
pub mod butterworth;
pub mod zero_phase;
pub mod conditioner;

pub use windows::{WindowType, generate_window};
pub use butterworth::{FilterMode, FilterSpec, SosFilter, Biquad};
pub use conditioner::{filter_row, filter_rows, apply_rows};
