//! Drawing sample node indices from an eligible set
//!
//! Every random draw goes through the generator passed in by the caller, so a
//! seeded generator reproduces the same index list.

use super::geometry::{Enclosure, Point3};
use super::kdtree::KdTree;
use super::region::GridSpec;
use crate::error::{Result, SpectralError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashSet};

/// Inputs of the spatially uniform method
#[derive(Clone, Copy)]
pub struct GridSampling<'a> {
    /// Coordinates of every mesh node
    pub coords: &'a [Point3],
    pub grid: &'a GridSpec,
    /// Closed surface of the body; lattice points outside it are discarded
    pub body: &'a dyn Enclosure,
}

/// How sample indices are drawn
#[derive(Clone, Copy)]
pub enum SamplingMethod<'a> {
    /// Uniform draw with replacement from the eligible set
    RandomPoint,
    /// Exactly one fixed node
    SinglePoint { point_id: usize },
    /// Nearest nodes to a uniform lattice, then a draw with replacement
    SpatialGrid(GridSampling<'a>),
}

impl SamplingMethod<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            SamplingMethod::RandomPoint => "RandomPoint",
            SamplingMethod::SinglePoint { .. } => "SinglePoint",
            SamplingMethod::SpatialGrid(_) => "SpatialGrid",
        }
    }
}

/// Generator for sampling: seeded when a seed is given, from entropy otherwise
pub fn sampling_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Draw sample indices from `eligible`
///
/// The result has `n_samples` entries (one for `SinglePoint`) and may repeat
/// indices; every entry is a member of `eligible`.
pub fn sample<R: Rng + ?Sized>(
    eligible: &[usize],
    n_samples: usize,
    method: &SamplingMethod<'_>,
    rng: &mut R,
) -> Result<Vec<usize>> {
    if eligible.is_empty() {
        return Err(SpectralError::EmptyRegion(
            "no eligible nodes to sample from".to_string(),
        ));
    }

    let sampled = match method {
        SamplingMethod::SinglePoint { point_id } => {
            if !eligible.contains(point_id) {
                return Err(SpectralError::InvalidRegion(format!(
                    "point {} is not in the selected region",
                    point_id
                )));
            }
            log::info!("[Sampler] single point spectrogram for node {}", point_id);
            vec![*point_id]
        }
        SamplingMethod::RandomPoint => {
            require_samples(n_samples)?;
            draw_with_replacement(eligible, n_samples, rng)
        }
        SamplingMethod::SpatialGrid(grid) => {
            require_samples(n_samples)?;
            let matched = lattice_nodes(eligible, grid)?;
            let sampled = draw_with_replacement(&matched, n_samples, rng);
            report_duplicates(&sampled);
            sampled
        }
    };

    log::debug!(
        "[Sampler] {} drew {} indices from {} eligible nodes",
        method.name(),
        sampled.len(),
        eligible.len()
    );
    Ok(sampled)
}

fn require_samples(n_samples: usize) -> Result<()> {
    if n_samples == 0 {
        return Err(SpectralError::InvalidInput(
            "at least one sample is required".to_string(),
        ));
    }
    Ok(())
}

fn draw_with_replacement<R: Rng + ?Sized>(pool: &[usize], n: usize, rng: &mut R) -> Vec<usize> {
    (0..n).map(|_| pool[rng.gen_range(0..pool.len())]).collect()
}

/// Nearest eligible nodes to the lattice points inside both the body and the sphere
///
/// Keeps lattice order; several lattice points may map to the same node.
fn lattice_nodes(eligible: &[usize], sampling: &GridSampling<'_>) -> Result<Vec<usize>> {
    let GridSampling { coords, grid, body } = *sampling;
    grid.validate()?;

    let lattice = grid.bounds.lattice(grid.subdivisions);
    let enclosed: Vec<Point3> = lattice
        .into_par_iter()
        .filter(|p| body.contains(p) && grid.sphere.contains(p))
        .collect();
    log::debug!(
        "[Sampler] {} of {} lattice points inside the body and sphere",
        enclosed.len(),
        grid.subdivisions.pow(3)
    );

    let tree = KdTree::build(coords);
    let nearest: Vec<usize> = enclosed
        .par_iter()
        .filter_map(|p| tree.nearest(p).map(|(idx, _)| idx))
        .collect();

    let allowed: HashSet<usize> = eligible.iter().copied().collect();
    let matched: Vec<usize> = nearest.into_iter().filter(|i| allowed.contains(i)).collect();
    if matched.is_empty() {
        return Err(SpectralError::EmptyRegion(
            "no lattice point maps to an eligible node".to_string(),
        ));
    }
    Ok(matched)
}

fn report_duplicates(sampled: &[usize]) {
    let distinct: BTreeSet<usize> = sampled.iter().copied().collect();
    if distinct.len() != sampled.len() {
        log::warn!(
            "[Sampler] duplicates in spatial sample: {} distinct nodes for {} samples",
            distinct.len(),
            sampled.len()
        );
    } else {
        log::debug!("[Sampler] no duplicates in spatial sample");
    }
}
