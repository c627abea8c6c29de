//! Scan matching: frame-to-frame registration of consecutive point clouds.

mod icp;
mod nn;

pub use icp::{rigid_transform_from_pairs, PointToPointIcp};
pub use nn::{BruteForceIndex, KdTreeIndex, NearestNeighbor};

use crate::core::types::{PointCloud2D, Pose2D};

/// Result of a registration attempt.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Transform mapping the source frame onto the destination frame.
    pub transform: Pose2D,

    /// Mean correspondence distance at the last iteration.
    ///
    /// Infinite for a failed registration.
    pub mean_error: f32,

    /// Iterations performed.
    pub iterations: u32,

    /// Whether the residual settled below tolerance before the cap.
    pub converged: bool,

    /// Mean residual per iteration, for diagnostics.
    pub residuals: Vec<f32>,
}

impl MatchResult {
    /// A failed registration: identity transform, infinite error.
    ///
    /// Callers must treat this as "registration failed", never as "no
    /// motion occurred".
    pub fn failed() -> Self {
        Self {
            transform: Pose2D::identity(),
            mean_error: f32::INFINITY,
            iterations: 0,
            converged: false,
            residuals: Vec::new(),
        }
    }

    /// True when the result is usable as a motion estimate.
    pub fn is_usable(&self) -> bool {
        self.mean_error.is_finite()
    }
}

/// Trait for scan matching algorithms.
pub trait ScanMatcher {
    /// Align `source` (current scan, local frame) onto `destination`
    /// (previous scan, local frame).
    fn match_scans(&self, source: &PointCloud2D, destination: &PointCloud2D) -> MatchResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_result_shape() {
        let result = MatchResult::failed();
        assert!(!result.converged);
        assert!(!result.is_usable());
        assert!(result.mean_error.is_infinite());
        assert_eq!(result.transform.x, 0.0);
        assert_eq!(result.transform.theta, 0.0);
    }
}
