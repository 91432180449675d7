//! Region descriptors and their resolution to eligible node indices

use super::geometry::{Aabb, Enclosure, Point3, Sphere};
use crate::error::{Result, SpectralError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Lattice resolution used when none is given
pub const DEFAULT_SUBDIVISIONS: usize = 50;

/// Where the sample points are taken from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegionDescriptor {
    /// Nodes strictly inside a sphere
    Sphere(Sphere),
    /// Nodes of two tagged mesh sub-domains
    TaggedDomain { fluid_id: u32, solid_id: u32 },
    /// Nodes inside the grid's sphere; sampled through a uniform lattice
    SpatialGrid(GridSpec),
}

/// Lattice used for spatially uniform sampling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub sphere: Sphere,
    pub bounds: Aabb,
    pub subdivisions: usize,
}

impl GridSpec {
    /// Lattice over the box circumscribing the sphere
    pub fn around(sphere: Sphere, subdivisions: usize) -> Self {
        Self {
            sphere,
            bounds: sphere.bounding_box(),
            subdivisions,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.sphere.validate()?;
        if self.subdivisions == 0 {
            return Err(SpectralError::InvalidRegion(
                "grid needs at least one subdivision".to_string(),
            ));
        }
        let ordered = (0..3).all(|axis| self.bounds.min[axis] <= self.bounds.max[axis]);
        if !ordered {
            return Err(SpectralError::InvalidRegion(format!(
                "grid bounds {:?} are inverted",
                self.bounds
            )));
        }
        Ok(())
    }
}

/// Simulated field being analysed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quantity {
    #[serde(rename = "d")]
    Displacement,
    #[serde(rename = "v")]
    Velocity,
    #[serde(rename = "p")]
    Pressure,
    #[serde(rename = "wss")]
    WallShearStress,
}

impl Quantity {
    pub fn short_name(&self) -> &'static str {
        match self {
            Quantity::Displacement => "d",
            Quantity::Velocity => "v",
            Quantity::Pressure => "p",
            Quantity::WallShearStress => "wss",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for Quantity {
    type Err = SpectralError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "d" | "displacement" => Ok(Quantity::Displacement),
            "v" | "velocity" => Ok(Quantity::Velocity),
            "p" | "pressure" => Ok(Quantity::Pressure),
            "wss" | "wall_shear_stress" => Ok(Quantity::WallShearStress),
            other => Err(SpectralError::InvalidInput(format!(
                "unknown quantity '{}'",
                other
            ))),
        }
    }
}

/// Which nodes of a region are eligible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionTarget {
    Fluid,
    Solid,
    /// Nodes shared by the fluid and solid domains
    Interface,
    All,
}

impl RegionTarget {
    /// wss → all (surface data), interface-only → interface, d → solid, v/p → fluid
    pub fn for_quantity(quantity: Quantity, interface_only: bool) -> Self {
        match quantity {
            Quantity::WallShearStress => RegionTarget::All,
            _ if interface_only => RegionTarget::Interface,
            Quantity::Displacement => RegionTarget::Solid,
            Quantity::Velocity | Quantity::Pressure => RegionTarget::Fluid,
        }
    }
}

/// Node sets of every tagged sub-domain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainTags {
    domains: BTreeMap<u32, BTreeSet<usize>>,
}

impl DomainTags {
    pub const DEFAULT_FLUID_ID: u32 = 1;
    pub const DEFAULT_SOLID_ID: u32 = 2;

    pub fn new() -> Self {
        Self::default()
    }

    /// Default fluid/solid tagging from two node lists
    pub fn fluid_solid<F, S>(fluid: F, solid: S) -> Self
    where
        F: IntoIterator<Item = usize>,
        S: IntoIterator<Item = usize>,
    {
        let mut tags = Self::new();
        tags.insert(Self::DEFAULT_FLUID_ID, fluid);
        tags.insert(Self::DEFAULT_SOLID_ID, solid);
        tags
    }

    /// Add nodes to a domain; a node may belong to several domains
    pub fn insert<I: IntoIterator<Item = usize>>(&mut self, domain_id: u32, nodes: I) {
        self.domains.entry(domain_id).or_default().extend(nodes);
    }

    pub fn nodes(&self, domain_id: u32) -> Option<&BTreeSet<usize>> {
        self.domains.get(&domain_id)
    }

    fn require(&self, domain_id: u32) -> Result<&BTreeSet<usize>> {
        self.nodes(domain_id).ok_or_else(|| {
            SpectralError::InvalidRegion(format!("domain id {} is not tagged on the mesh", domain_id))
        })
    }

    /// Fluid, solid, interface or combined node set for a domain pair
    fn target_set(&self, fluid_id: u32, solid_id: u32, target: RegionTarget) -> Result<BTreeSet<usize>> {
        let fluid = self.require(fluid_id)?;
        let solid = self.require(solid_id)?;
        Ok(match target {
            RegionTarget::Fluid => fluid.clone(),
            RegionTarget::Solid => solid.clone(),
            RegionTarget::Interface => fluid.intersection(solid).copied().collect(),
            RegionTarget::All => fluid.union(solid).copied().collect(),
        })
    }
}

/// Domain information available for the analysed field
#[derive(Debug, Clone, PartialEq)]
pub enum NodeDomains {
    /// Volume mesh with tagged sub-domains
    Volume(DomainTags),
    /// Wall surface only (wall shear stress); no fluid/solid split
    Surface,
}

/// Resolve a region to its eligible node indices, sorted ascending
pub fn select_region(
    coords: &[Point3],
    descriptor: &RegionDescriptor,
    domains: &NodeDomains,
    target: RegionTarget,
) -> Result<Vec<usize>> {
    let eligible: Vec<usize> = match descriptor {
        RegionDescriptor::Sphere(sphere) => {
            sphere.validate()?;
            in_sphere(coords, sphere, domains, target)?
        }
        RegionDescriptor::SpatialGrid(grid) => {
            grid.validate()?;
            in_sphere(coords, &grid.sphere, domains, target)?
        }
        RegionDescriptor::TaggedDomain { fluid_id, solid_id } => {
            let tags = match domains {
                NodeDomains::Volume(tags) => tags,
                NodeDomains::Surface => {
                    return Err(SpectralError::InvalidRegion(
                        "surface data has no tagged sub-domains; use a sphere region".to_string(),
                    ))
                }
            };
            let nodes = tags.target_set(*fluid_id, *solid_id, target)?;
            let total = nodes.len();
            let valid: Vec<usize> = nodes.into_iter().filter(|&i| i < coords.len()).collect();
            if valid.len() < total {
                log::warn!(
                    "[Region] dropped {} tagged nodes outside the coordinate set",
                    total - valid.len()
                );
            }
            valid
        }
    };

    if eligible.is_empty() {
        return Err(SpectralError::EmptyRegion(format!(
            "{:?} selects no {:?} nodes",
            descriptor, target
        )));
    }
    log::info!("[Region] {} eligible {:?} nodes", eligible.len(), target);
    Ok(eligible)
}

fn in_sphere(
    coords: &[Point3],
    sphere: &Sphere,
    domains: &NodeDomains,
    target: RegionTarget,
) -> Result<Vec<usize>> {
    let inside = coords
        .iter()
        .enumerate()
        .filter(|(_, p)| sphere.contains(p))
        .map(|(i, _)| i);

    match (domains, target) {
        (NodeDomains::Surface, RegionTarget::All) => Ok(inside.collect()),
        (NodeDomains::Surface, other) => Err(SpectralError::InvalidRegion(format!(
            "surface data has no {:?} nodes",
            other
        ))),
        (NodeDomains::Volume(tags), target) => {
            let allowed = tags.target_set(
                DomainTags::DEFAULT_FLUID_ID,
                DomainTags::DEFAULT_SOLID_ID,
                target,
            )?;
            Ok(inside.filter(|i| allowed.contains(i)).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_coords(n: usize) -> Vec<Point3> {
        (0..n).map(|i| [i as f64, i as f64, i as f64]).collect()
    }

    fn tags() -> DomainTags {
        // Nodes 0..=3 fluid, 3..=5 solid, node 3 on the interface
        DomainTags::fluid_solid(0..=3, 3..=5)
    }

    #[test]
    fn test_sphere_containment_is_exact() {
        let coords = line_coords(6);
        let sphere = Sphere::new([0.0, 0.0, 0.0], 3.0f64.sqrt() * 2.0);
        let selected = select_region(
            &coords,
            &RegionDescriptor::Sphere(sphere),
            &NodeDomains::Surface,
            RegionTarget::All,
        )
        .unwrap();

        // Node 2 lies exactly on the boundary and is excluded
        assert_eq!(selected, vec![0, 1]);
        for (i, p) in coords.iter().enumerate() {
            assert_eq!(selected.contains(&i), sphere.contains(p));
        }
    }

    #[test]
    fn test_sphere_with_domain_targets() {
        let coords = line_coords(6);
        let descriptor = RegionDescriptor::Sphere(Sphere::new([0.0; 3], 1e6));
        let domains = NodeDomains::Volume(tags());

        let fluid = select_region(&coords, &descriptor, &domains, RegionTarget::Fluid).unwrap();
        let solid = select_region(&coords, &descriptor, &domains, RegionTarget::Solid).unwrap();
        let interface = select_region(&coords, &descriptor, &domains, RegionTarget::Interface).unwrap();
        let all = select_region(&coords, &descriptor, &domains, RegionTarget::All).unwrap();

        assert_eq!(fluid, vec![0, 1, 2, 3]);
        assert_eq!(solid, vec![3, 4, 5]);
        assert_eq!(interface, vec![3]);
        assert_eq!(all, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_tagged_domain() {
        let coords = line_coords(5);
        let mut tags = DomainTags::new();
        tags.insert(7, [0, 1, 2]);
        tags.insert(9, [2, 3, 4, 10]);
        let domains = NodeDomains::Volume(tags);
        let descriptor = RegionDescriptor::TaggedDomain { fluid_id: 7, solid_id: 9 };

        let solid = select_region(&coords, &descriptor, &domains, RegionTarget::Solid).unwrap();
        // Node 10 has no coordinates
        assert_eq!(solid, vec![2, 3, 4]);

        let interface = select_region(&coords, &descriptor, &domains, RegionTarget::Interface).unwrap();
        assert_eq!(interface, vec![2]);

        let missing = RegionDescriptor::TaggedDomain { fluid_id: 7, solid_id: 8 };
        assert!(matches!(
            select_region(&coords, &missing, &domains, RegionTarget::Fluid),
            Err(SpectralError::InvalidRegion(_))
        ));
    }

    #[test]
    fn test_tagged_domain_on_surface_is_invalid() {
        let coords = line_coords(3);
        let descriptor = RegionDescriptor::TaggedDomain { fluid_id: 1, solid_id: 2 };
        assert!(matches!(
            select_region(&coords, &descriptor, &NodeDomains::Surface, RegionTarget::All),
            Err(SpectralError::InvalidRegion(_))
        ));
    }

    #[test]
    fn test_empty_region() {
        let coords = line_coords(3);
        let descriptor = RegionDescriptor::Sphere(Sphere::new([100.0; 3], 1.0));
        assert!(matches!(
            select_region(&coords, &descriptor, &NodeDomains::Surface, RegionTarget::All),
            Err(SpectralError::EmptyRegion(_))
        ));
    }

    #[test]
    fn test_spatial_grid_region_uses_sphere() {
        let coords = line_coords(6);
        let grid = GridSpec::around(Sphere::new([0.0; 3], 3.0), 10);
        assert_eq!(grid.bounds.max, [3.0, 3.0, 3.0]);

        let selected = select_region(
            &coords,
            &RegionDescriptor::SpatialGrid(grid),
            &NodeDomains::Surface,
            RegionTarget::All,
        )
        .unwrap();
        assert_eq!(selected, vec![0, 1]);
    }

    #[test]
    fn test_target_for_quantity() {
        assert_eq!(RegionTarget::for_quantity(Quantity::WallShearStress, true), RegionTarget::All);
        assert_eq!(RegionTarget::for_quantity(Quantity::Velocity, true), RegionTarget::Interface);
        assert_eq!(RegionTarget::for_quantity(Quantity::Displacement, false), RegionTarget::Solid);
        assert_eq!(RegionTarget::for_quantity(Quantity::Pressure, false), RegionTarget::Fluid);
        assert_eq!("wss".parse::<Quantity>().unwrap(), Quantity::WallShearStress);
        assert!("q".parse::<Quantity>().is_err());
    }
}
