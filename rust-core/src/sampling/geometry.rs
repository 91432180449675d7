//! Geometric primitives for region selection
//!
//! Points are plain `[f64; 3]` arrays indexed by mesh node.

use crate::error::{Result, SpectralError};
use serde::{Deserialize, Serialize};

pub type Point3 = [f64; 3];

#[inline]
pub fn squared_distance(a: &Point3, b: &Point3) -> f64 {
    (0..3).map(|i| (a[i] - b[i]) * (a[i] - b[i])).sum()
}

#[inline]
pub fn distance(a: &Point3, b: &Point3) -> f64 {
    squared_distance(a, b).sqrt()
}

fn sub(a: &Point3, b: &Point3) -> Point3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: &Point3, b: &Point3) -> Point3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: &Point3, b: &Point3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// A closed volume that can answer point-membership queries
pub trait Enclosure: Sync {
    fn contains(&self, point: &Point3) -> bool;
}

/// Open ball: the boundary itself is outside
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Point3,
    pub radius: f64,
}

impl Sphere {
    pub fn new(center: Point3, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.center.iter().all(|c| c.is_finite()) {
            return Err(SpectralError::InvalidRegion(format!(
                "sphere centre {:?} is not finite",
                self.center
            )));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(SpectralError::InvalidRegion(format!(
                "sphere radius must be positive, got {}",
                self.radius
            )));
        }
        Ok(())
    }

    /// Axis-aligned box circumscribing the sphere
    pub fn bounding_box(&self) -> Aabb {
        let [x, y, z] = self.center;
        let r = self.radius;
        Aabb {
            min: [x - r, y - r, z - r],
            max: [x + r, y + r, z + r],
        }
    }
}

impl Enclosure for Sphere {
    fn contains(&self, point: &Point3) -> bool {
        distance(point, &self.center) < self.radius
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point3,
    pub max: Point3,
}

impl Aabb {
    /// Smallest box holding every point, `None` for an empty set
    pub fn from_points(points: &[Point3]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Aabb {
            min: *first,
            max: *first,
        };
        for p in &points[1..] {
            for axis in 0..3 {
                bounds.min[axis] = bounds.min[axis].min(p[axis]);
                bounds.max[axis] = bounds.max[axis].max(p[axis]);
            }
        }
        Some(bounds)
    }

    /// Regular lattice of `subdivisions³` points spanning the box, x-major order
    pub fn lattice(&self, subdivisions: usize) -> Vec<Point3> {
        let axis_points: Vec<Vec<f64>> = (0..3)
            .map(|axis| {
                crate::spectrum::linspace(self.min[axis], self.max[axis], subdivisions)
            })
            .collect();

        let mut points = Vec::with_capacity(subdivisions.pow(3));
        for &x in &axis_points[0] {
            for &y in &axis_points[1] {
                for &z in &axis_points[2] {
                    points.push([x, y, z]);
                }
            }
        }
        points
    }
}

impl Enclosure for Aabb {
    fn contains(&self, point: &Point3) -> bool {
        (0..3).all(|axis| point[axis] >= self.min[axis] && point[axis] <= self.max[axis])
    }
}

/// Closed triangulated surface (e.g. the outer wall of the solid body)
#[derive(Debug, Clone)]
pub struct TriangulatedSurface {
    vertices: Vec<Point3>,
    triangles: Vec<[usize; 3]>,
    bounds: Aabb,
}

/// Ray direction for parity tests, chosen off every coordinate axis and plane
const RAY_DIRECTION: Point3 = [0.577_215_664_9, 0.318_309_886_2, 0.751_828_394_6];

impl TriangulatedSurface {
    pub fn new(vertices: Vec<Point3>, triangles: Vec<[usize; 3]>) -> Result<Self> {
        let bounds = Aabb::from_points(&vertices).ok_or_else(|| {
            SpectralError::InvalidRegion("surface has no vertices".to_string())
        })?;
        if triangles.is_empty() {
            return Err(SpectralError::InvalidRegion(
                "surface has no triangles".to_string(),
            ));
        }
        if let Some(bad) = triangles
            .iter()
            .flatten()
            .find(|&&v| v >= vertices.len())
        {
            return Err(SpectralError::InvalidRegion(format!(
                "triangle references vertex {} but the surface has {}",
                bad,
                vertices.len()
            )));
        }

        Ok(Self {
            vertices,
            triangles,
            bounds,
        })
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Möller–Trumbore intersection distance along the ray, if any
    fn ray_hit(&self, origin: &Point3, triangle: &[usize; 3]) -> Option<f64> {
        const EPS: f64 = 1e-12;
        let v0 = &self.vertices[triangle[0]];
        let e1 = sub(&self.vertices[triangle[1]], v0);
        let e2 = sub(&self.vertices[triangle[2]], v0);

        let p = cross(&RAY_DIRECTION, &e2);
        let det = dot(&e1, &p);
        if det.abs() < EPS {
            return None;
        }
        let inv_det = 1.0 / det;

        let s = sub(origin, v0);
        let u = dot(&s, &p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = cross(&s, &e1);
        let v = dot(&RAY_DIRECTION, &q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = dot(&e2, &q) * inv_det;
        (t > EPS).then_some(t)
    }
}

impl Enclosure for TriangulatedSurface {
    /// Inside when a ray from the point crosses the surface an odd number of times
    fn contains(&self, point: &Point3) -> bool {
        if !self.bounds.contains(point) {
            return false;
        }
        let crossings = self
            .triangles
            .iter()
            .filter(|triangle| self.ray_hit(point, triangle).is_some())
            .count();
        crossings % 2 == 1
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Closed axis-aligned box surface made of 12 triangles
    pub(crate) fn box_surface(min: Point3, max: Point3) -> TriangulatedSurface {
        let [x0, y0, z0] = min;
        let [x1, y1, z1] = max;
        let vertices = vec![
            [x0, y0, z0],
            [x1, y0, z0],
            [x1, y1, z0],
            [x0, y1, z0],
            [x0, y0, z1],
            [x1, y0, z1],
            [x1, y1, z1],
            [x0, y1, z1],
        ];
        let triangles = vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [3, 6, 2],
            [3, 7, 6],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ];
        TriangulatedSurface::new(vertices, triangles).unwrap()
    }

    #[test]
    fn test_sphere_boundary_is_open() {
        let sphere = Sphere::new([0.0, 0.0, 0.0], 1.0);
        assert!(sphere.contains(&[0.5, 0.5, 0.5]));
        assert!(!sphere.contains(&[1.0, 0.0, 0.0]));
        assert!(!sphere.contains(&[1.0, 1.0, 0.0]));
    }

    #[test]
    fn test_sphere_validation() {
        assert!(Sphere::new([0.0; 3], 1.0).validate().is_ok());
        assert!(Sphere::new([0.0; 3], 0.0).validate().is_err());
        assert!(Sphere::new([f64::NAN, 0.0, 0.0], 1.0).validate().is_err());
    }

    #[test]
    fn test_lattice() {
        let bounds = Sphere::new([1.0, 2.0, 3.0], 1.0).bounding_box();
        let lattice = bounds.lattice(3);
        assert_eq!(lattice.len(), 27);
        assert_eq!(lattice[0], [0.0, 1.0, 2.0]);
        assert_eq!(lattice[1], [0.0, 1.0, 3.0]);
        assert_eq!(lattice[13], [1.0, 2.0, 3.0]);
        assert_eq!(lattice[26], [2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_point_in_mesh() {
        let surface = box_surface([0.0, 0.0, 0.0], [2.0, 1.0, 1.0]);
        assert_eq!(surface.triangle_count(), 12);

        assert!(surface.contains(&[1.0, 0.5, 0.5]));
        assert!(surface.contains(&[0.1, 0.9, 0.2]));
        assert!(surface.contains(&[1.9, 0.1, 0.9]));
        assert!(!surface.contains(&[2.5, 0.5, 0.5]));
        assert!(!surface.contains(&[1.0, -0.1, 0.5]));
        assert!(!surface.contains(&[-5.0, -5.0, -5.0]));
    }

    #[test]
    fn test_surface_rejects_bad_indices() {
        assert!(TriangulatedSurface::new(vec![[0.0; 3]], vec![[0, 0, 1]]).is_err());
        assert!(TriangulatedSurface::new(Vec::new(), vec![[0, 1, 2]]).is_err());
    }
}
