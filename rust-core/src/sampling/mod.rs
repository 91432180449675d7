//! Spatial selection of the mesh nodes to analyse

pub mod geometry;
pub mod kdtree;
pub mod region;
pub mod sampler;

pub use geometry::{Aabb, Enclosure, Point3, Sphere, TriangulatedSurface};
pub use kdtree::KdTree;
pub use region::{
    select_region, DomainTags, GridSpec, NodeDomains, Quantity, RegionDescriptor, RegionTarget,
    DEFAULT_SUBDIVISIONS,
};
pub use sampler::{sample, sampling_rng, GridSampling, SamplingMethod};
