//! Static 3-D k-d tree for nearest-node queries

use super::geometry::{squared_distance, Point3};

#[derive(Debug, Clone)]
struct Node {
    /// Index into the point set
    point: usize,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// Nearest-neighbour index over a fixed point set
///
/// Built once by median splits; queries return the index of the closest
/// point, ties going to the lowest index.
#[derive(Debug, Clone)]
pub struct KdTree<'a> {
    points: &'a [Point3],
    nodes: Vec<Node>,
    root: Option<usize>,
}

impl<'a> KdTree<'a> {
    pub fn build(points: &'a [Point3]) -> Self {
        let mut tree = Self {
            points,
            nodes: Vec::with_capacity(points.len()),
            root: None,
        };
        let mut indices: Vec<usize> = (0..points.len()).collect();
        tree.root = tree.build_subtree(&mut indices, 0);
        tree
    }

    fn build_subtree(&mut self, indices: &mut [usize], depth: usize) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }
        let axis = depth % 3;
        let mid = indices.len() / 2;
        let points = self.points;
        indices.select_nth_unstable_by(mid, |&a, &b| {
            points[a][axis].total_cmp(&points[b][axis]).then(a.cmp(&b))
        });

        let point = indices[mid];
        let (left, rest) = indices.split_at_mut(mid);
        let left = self.build_subtree(left, depth + 1);
        let right = self.build_subtree(&mut rest[1..], depth + 1);

        self.nodes.push(Node {
            point,
            axis,
            left,
            right,
        });
        Some(self.nodes.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Closest point to `query` as (index, distance)
    pub fn nearest(&self, query: &Point3) -> Option<(usize, f64)> {
        let root = self.root?;
        let mut best = (usize::MAX, f64::INFINITY);
        self.search(root, query, &mut best);
        Some((best.0, best.1.sqrt()))
    }

    fn search(&self, node_id: usize, query: &Point3, best: &mut (usize, f64)) {
        let node = &self.nodes[node_id];
        let candidate = &self.points[node.point];

        let d2 = squared_distance(query, candidate);
        if d2 < best.1 || (d2 == best.1 && node.point < best.0) {
            *best = (node.point, d2);
        }

        let diff = query[node.axis] - candidate[node.axis];
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near) = near {
            self.search(near, query, best);
        }
        if let Some(far) = far {
            if diff * diff <= best.1 {
                self.search(far, query, best);
            }
        }
    }
}
