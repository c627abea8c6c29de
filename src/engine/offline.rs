//! Batch registration of recorded scans.
//!
//! The offline counterpart of the streaming pipeline: all clouds are known
//! up front, the full sequence is kept, and the map extent is derived from
//! the accumulated bounding box instead of being pre-set.

use crate::algorithms::mapping::HistogramGrid;
use crate::algorithms::matching::{KdTreeIndex, PointToPointIcp, ScanMatcher};
use crate::config::{IcpConfig, MapConfig};
use crate::core::types::{PointCloud2D, Pose2D};
use crate::engine::trajectory::Trajectory;

/// Knobs for batch runs over recorded data.
#[derive(Debug, Clone)]
pub struct OfflineConfig {
    pub icp: IcpConfig,
    /// Use every Nth scan (1 = all)
    pub frame_stride: usize,
    /// Keep one point in K from each scan (1 = all)
    pub point_stride: usize,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            icp: IcpConfig::default(),
            frame_stride: 1,
            point_stride: 1,
        }
    }
}

/// Result of a batch run.
#[derive(Debug, Clone)]
pub struct OfflineResult {
    /// Pose per registered scan
    pub trajectory: Vec<Pose2D>,
    /// Every registered point in the world frame
    pub world_points: PointCloud2D,
    /// Registrations that failed and held the previous pose
    pub failed_registrations: u64,
}

impl OfflineResult {
    /// Build the bounds-derived histogram map for this run.
    pub fn build_map(&self, map: &MapConfig) -> Option<HistogramGrid> {
        HistogramGrid::from_points(&self.world_points, map.resolution, map.padding)
    }
}

/// Register a recorded scan sequence pairwise and chain the poses.
pub fn run_offline(scans: &[PointCloud2D], config: &OfflineConfig) -> OfflineResult {
    let matcher = PointToPointIcp::<KdTreeIndex>::new(config.icp.clone());

    let kept: Vec<PointCloud2D> = scans
        .iter()
        .step_by(config.frame_stride.max(1))
        .map(|cloud| subsample(cloud, config.point_stride))
        .filter(|cloud| cloud.len() >= config.icp.min_points_per_scan)
        .collect();

    let mut trajectory = Trajectory::new();
    let mut world_points = PointCloud2D::new();
    let mut failed_registrations = 0u64;

    for (i, cloud) in kept.iter().enumerate() {
        let pose = if i == 0 {
            trajectory.start_at_origin()
        } else {
            let result = matcher.match_scans(cloud, &kept[i - 1]);
            if result.is_usable() {
                trajectory.advance(&result.transform)
            } else {
                failed_registrations += 1;
                log::warn!("offline registration failed at scan {i}, holding pose");
                trajectory.repeat_last()
            }
        };

        let world = cloud.transform(&pose);
        for j in 0..world.len() {
            world_points.push_xy(world.xs[j], world.ys[j]);
        }
    }

    OfflineResult {
        trajectory: trajectory.poses().to_vec(),
        world_points,
        failed_registrations,
    }
}

fn subsample(cloud: &PointCloud2D, stride: usize) -> PointCloud2D {
    if stride <= 1 {
        return cloud.clone();
    }
    let mut out = PointCloud2D::with_capacity(cloud.len() / stride + 1);
    for i in (0..cloud.len()).step_by(stride) {
        out.push_xy(cloud.xs[i], cloud.ys[i]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Point2D;
    use approx::assert_relative_eq;

    fn room(n: usize) -> PointCloud2D {
        let mut cloud = PointCloud2D::new();
        let per_wall = n / 4;
        for i in 0..per_wall {
            let t = i as f32 / per_wall as f32;
            cloud.push(Point2D::new(t * 4.0, 0.0));
            cloud.push(Point2D::new(t * 4.0, 3.0));
            cloud.push(Point2D::new(0.0, t * 3.0));
            cloud.push(Point2D::new(4.0, t * 3.0));
        }
        cloud
    }

    fn small_config() -> OfflineConfig {
        OfflineConfig {
            icp: IcpConfig {
                min_points_per_scan: 10,
                ..IcpConfig::default()
            },
            ..OfflineConfig::default()
        }
    }

    #[test]
    fn test_offline_recovers_straight_motion() {
        // sensor steps +0.05m in x per scan: each scan sees the room shifted
        // the opposite way in its local frame
        let base = room(160);
        let mut scans = Vec::new();
        for i in 0..4 {
            let sensor = Pose2D::new(i as f32 * 0.05, 0.0, 0.0);
            scans.push(base.transform(&sensor.inverse()));
        }

        let result = run_offline(&scans, &small_config());
        assert_eq!(result.trajectory.len(), 4);
        assert_eq!(result.failed_registrations, 0);
        assert_relative_eq!(result.trajectory[3].x, 0.15, epsilon = 0.03);
        assert_relative_eq!(result.trajectory[3].y, 0.0, epsilon = 0.03);
    }

    #[test]
    fn test_offline_sparse_scans_filtered() {
        let mut scans = vec![room(160)];
        let mut tiny = PointCloud2D::new();
        tiny.push(Point2D::new(1.0, 1.0));
        scans.push(tiny);
        scans.push(room(160));

        let result = run_offline(&scans, &small_config());
        // the sparse scan never enters the chain
        assert_eq!(result.trajectory.len(), 2);
    }

    #[test]
    fn test_offline_strides() {
        let base = room(160);
        let scans = vec![base.clone(), base.clone(), base.clone(), base.clone()];
        let config = OfflineConfig {
            frame_stride: 2,
            point_stride: 2,
            ..small_config()
        };

        let result = run_offline(&scans, &config);
        assert_eq!(result.trajectory.len(), 2);
        assert_eq!(result.world_points.len(), base.len() / 2 * 2);
    }

    #[test]
    fn test_offline_map_from_bounds() {
        let base = room(160);
        let result = run_offline(&[base.clone(), base], &small_config());
        let map = result
            .build_map(&MapConfig {
                resolution: 0.1,
                half_extent: 0.0,
                padding: 1.0,
            })
            .unwrap();

        let extent = map.extent();
        assert!(extent[0] <= -1.0 && extent[2] >= 4.8);
        assert_eq!(map.total_points() as usize, result.world_points.len());
    }

    #[test]
    fn test_offline_empty_input() {
        let result = run_offline(&[], &small_config());
        assert!(result.trajectory.is_empty());
        assert!(result.world_points.is_empty());
    }
}
