//! Nearest-neighbour search seam for the scan matcher.
//!
//! ICP only needs "closest destination point to this query"; the index
//! behind that query is swappable. The k-d tree is the default; the
//! brute-force scan exists for tiny clouds and as a reference in tests.

use crate::core::types::PointCloud2D;
use kiddo::SquaredEuclidean;

/// Concrete kiddo float k-d tree type.
///
/// Mirrors kiddo's `KdTree<f32, 2>` alias but with a larger leaf bucket
/// size. kiddo's construction panics when more than `B` points share the
/// same value on a split axis ("Too many items with the same position on
/// one axis"), which degenerate axis-aligned clouds (flat walls) readily
/// hit with the default `B = 32`. The bucket size only affects internal
/// tree layout — the nearest-neighbour result is identical for any `B`.
type KdTree2 = kiddo::float::kdtree::KdTree<f32, u64, 2, 256, u32>;

/// Exact nearest-neighbour index over a fixed point cloud.
pub trait NearestNeighbor {
    /// Build the index over a destination cloud.
    fn build(cloud: &PointCloud2D) -> Self;

    /// Return `(index, squared_distance)` of the closest indexed point.
    ///
    /// Must not be called on an index built from an empty cloud.
    fn nearest(&self, x: f32, y: f32) -> (usize, f32);
}

/// k-d tree index.
pub struct KdTreeIndex {
    tree: KdTree2,
}

impl NearestNeighbor for KdTreeIndex {
    fn build(cloud: &PointCloud2D) -> Self {
        let mut tree: KdTree2 = KdTree2::new();
        for i in 0..cloud.len() {
            tree.add(&[cloud.xs[i], cloud.ys[i]], i as u64);
        }
        Self { tree }
    }

    fn nearest(&self, x: f32, y: f32) -> (usize, f32) {
        let nearest = self.tree.nearest_one::<SquaredEuclidean>(&[x, y]);
        (nearest.item as usize, nearest.distance)
    }
}

/// Exhaustive O(n) scan.
pub struct BruteForceIndex {
    xs: Vec<f32>,
    ys: Vec<f32>,
}

impl NearestNeighbor for BruteForceIndex {
    fn build(cloud: &PointCloud2D) -> Self {
        Self {
            xs: cloud.xs.clone(),
            ys: cloud.ys.clone(),
        }
    }

    fn nearest(&self, x: f32, y: f32) -> (usize, f32) {
        let mut best = (0usize, f32::MAX);
        for i in 0..self.xs.len() {
            let dx = self.xs[i] - x;
            let dy = self.ys[i] - y;
            let d2 = dx * dx + dy * dy;
            if d2 < best.1 {
                best = (i, d2);
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Point2D;

    fn sample_cloud() -> PointCloud2D {
        let mut cloud = PointCloud2D::new();
        cloud.push(Point2D::new(0.0, 0.0));
        cloud.push(Point2D::new(1.0, 0.0));
        cloud.push(Point2D::new(0.0, 2.0));
        cloud.push(Point2D::new(-3.0, 1.0));
        cloud
    }

    #[test]
    fn test_brute_force_finds_closest() {
        let index = BruteForceIndex::build(&sample_cloud());
        let (i, d2) = index.nearest(0.9, 0.1);
        assert_eq!(i, 1);
        assert!(d2 < 0.03);
    }

    #[test]
    fn test_kdtree_agrees_with_brute_force() {
        let cloud = sample_cloud();
        let kd = KdTreeIndex::build(&cloud);
        let bf = BruteForceIndex::build(&cloud);

        for &(qx, qy) in &[(0.0f32, 0.0f32), (0.6, 0.4), (-2.0, 2.0), (10.0, -10.0)] {
            let (ki, kd2) = kd.nearest(qx, qy);
            let (bi, bd2) = bf.nearest(qx, qy);
            assert_eq!(ki, bi, "query ({qx}, {qy})");
            assert!((kd2 - bd2).abs() < 1e-6);
        }
    }
}
