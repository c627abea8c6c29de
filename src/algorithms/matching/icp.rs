//! Point-to-point Iterative Closest Point.
//!
//! Aligns the current scan's cloud onto the previous scan's cloud:
//!
//! 1. Nearest neighbour in the destination for every source point
//! 2. Quantile outlier rejection over the squared correspondence distances
//! 3. Closed-form rigid solve (centroids, cross-covariance, SVD with the
//!    reflection repaired to a proper rotation)
//! 4. Apply to the running source copy, fold into the accumulated transform
//! 5. Stop when the mean residual settles or the iteration cap is reached

use super::nn::NearestNeighbor;
use super::MatchResult;
use crate::config::IcpConfig;
use crate::core::math::{svd2x2, Mat2, Rot2};
use crate::core::types::{PointCloud2D, Pose2D};

/// Minimum correspondences for a solvable rigid fit.
const MIN_CORRESPONDENCES: usize = 3;

/// Point-to-point ICP matcher, generic over the nearest-neighbour index.
#[derive(Debug, Clone)]
pub struct PointToPointIcp<N> {
    config: IcpConfig,
    _index: std::marker::PhantomData<N>,
}

impl<N: NearestNeighbor> PointToPointIcp<N> {
    /// Create a matcher with the given configuration.
    pub fn new(config: IcpConfig) -> Self {
        Self {
            config,
            _index: std::marker::PhantomData,
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &IcpConfig {
        &self.config
    }

    /// Align `source` (current scan) onto `destination` (previous scan).
    pub fn align(&self, source: &PointCloud2D, destination: &PointCloud2D) -> MatchResult {
        if source.len() < MIN_CORRESPONDENCES || destination.len() < MIN_CORRESPONDENCES {
            return MatchResult::failed();
        }

        let index = N::build(destination);
        let mut src = source.clone();
        let mut total = Pose2D::identity();
        let mut residuals: Vec<f32> = Vec::new();
        let mut prev_mean: Option<f32> = None;
        let mut iterations = 0u32;
        let mut converged = false;

        for _ in 0..self.config.max_iterations {
            iterations += 1;

            // (source index, destination index, squared distance)
            let mut pairs: Vec<(usize, usize, f32)> = Vec::with_capacity(src.len());
            for i in 0..src.len() {
                let (j, d2) = index.nearest(src.xs[i], src.ys[i]);
                pairs.push((i, j, d2));
            }

            let kept = self.reject_outliers(pairs);
            if kept.len() < MIN_CORRESPONDENCES {
                // Degenerate even without filtering: this is a failed
                // registration, not zero motion.
                return MatchResult::failed();
            }

            let Some((rot, tx, ty)) = rigid_transform_from_pairs(&src, destination, &kept) else {
                return MatchResult::failed();
            };
            let delta = Pose2D::new(tx, ty, rot.angle());

            src.transform_mut(&delta);
            total = delta.compose(&total);

            let mean = kept.iter().map(|&(_, _, d2)| d2.sqrt()).sum::<f32>() / kept.len() as f32;
            residuals.push(mean);

            if let Some(prev) = prev_mean {
                if (prev - mean).abs() < self.config.residual_tolerance {
                    converged = true;
                    break;
                }
            }
            prev_mean = Some(mean);
        }

        MatchResult {
            transform: total,
            mean_error: residuals.last().copied().unwrap_or(f32::INFINITY),
            iterations,
            converged,
            residuals,
        }
    }

    /// Keep correspondences up to the configured squared-distance quantile.
    ///
    /// Falls back to the full unfiltered set when rejection would leave the
    /// solve underdetermined.
    fn reject_outliers(
        &self,
        pairs: Vec<(usize, usize, f32)>,
    ) -> Vec<(usize, usize, f32)> {
        let q = self.config.outlier_quantile;
        if !(0.0..1.0).contains(&q) || pairs.len() <= MIN_CORRESPONDENCES {
            return pairs;
        }

        let mut dists: Vec<f32> = pairs.iter().map(|&(_, _, d2)| d2).collect();
        dists.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let k = ((dists.len() - 1) as f32 * q).ceil() as usize;
        let threshold = dists[k.min(dists.len() - 1)];

        let kept: Vec<_> = pairs
            .iter()
            .copied()
            .filter(|&(_, _, d2)| d2 <= threshold)
            .collect();

        if kept.len() < MIN_CORRESPONDENCES {
            pairs
        } else {
            kept
        }
    }
}

impl<N: NearestNeighbor> super::ScanMatcher for PointToPointIcp<N> {
    fn match_scans(&self, source: &PointCloud2D, destination: &PointCloud2D) -> MatchResult {
        self.align(source, destination)
    }
}

/// Best-fit rigid transform for a set of correspondences.
///
/// Centers both sides on their centroids, builds the 2x2 cross-covariance,
/// factors it with the closed-form SVD and assembles `R = V Uᵀ`. A raw
/// factorization with negative determinant is a reflection, which is not a
/// physical motion here; the second column of V is flipped to force a proper
/// rotation. Returns `(rotation, tx, ty)` with `d ≈ R s + t`.
pub fn rigid_transform_from_pairs(
    src: &PointCloud2D,
    dst: &PointCloud2D,
    pairs: &[(usize, usize, f32)],
) -> Option<(Rot2, f32, f32)> {
    if pairs.len() < MIN_CORRESPONDENCES {
        return None;
    }

    let inv_n = 1.0 / pairs.len() as f32;
    let mut mu_sx = 0.0f32;
    let mut mu_sy = 0.0f32;
    let mut mu_dx = 0.0f32;
    let mut mu_dy = 0.0f32;
    for &(si, di, _) in pairs {
        mu_sx += src.xs[si];
        mu_sy += src.ys[si];
        mu_dx += dst.xs[di];
        mu_dy += dst.ys[di];
    }
    mu_sx *= inv_n;
    mu_sy *= inv_n;
    mu_dx *= inv_n;
    mu_dy *= inv_n;

    // S = Σ (s - μs)(d - μd)ᵀ
    let mut s = Mat2::zero();
    for &(si, di, _) in pairs {
        let sx = src.xs[si] - mu_sx;
        let sy = src.ys[si] - mu_sy;
        let dx = dst.xs[di] - mu_dx;
        let dy = dst.ys[di] - mu_dy;
        s.m00 += sx * dx;
        s.m01 += sx * dy;
        s.m10 += sy * dx;
        s.m11 += sy * dy;
    }

    let (u, _sigma, v) = svd2x2(&s);
    let mut r = v.mul(&u.transpose());
    if r.det() < 0.0 {
        r = v.flip_second_column().mul(&u.transpose());
    }
    let rot = Rot2::from_matrix(&r);

    let (rx, ry) = rot.apply(mu_sx, mu_sy);
    Some((rot, mu_dx - rx, mu_dy - ry))
}
