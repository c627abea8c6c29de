//! Pose chain: composition of relative transforms into a trajectory.

use crate::core::types::Pose2D;

/// Append-only sequence of absolute poses, index-aligned with the accepted
/// scan sequence.
///
/// The first scan anchors the world frame at identity. Each later scan
/// composes the previous absolute pose with the matcher's relative transform
/// (previous first, relative second, so translations come out in the world
/// frame). A failed registration repeats the previous pose unchanged — the
/// step is treated as unobserved motion, never as a made-up transform.
/// Earlier poses are never rewritten.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    poses: Vec<Pose2D>,
}

impl Trajectory {
    /// Empty trajectory.
    pub fn new() -> Self {
        Self { poses: Vec::new() }
    }

    /// Anchor the first scan at the origin.
    ///
    /// # Panics
    /// Panics if poses were already appended.
    pub fn start_at_origin(&mut self) -> Pose2D {
        assert!(self.poses.is_empty(), "trajectory already started");
        let pose = Pose2D::identity();
        self.poses.push(pose);
        pose
    }

    /// Append the pose reached by applying `relative` after the last pose.
    ///
    /// # Panics
    /// Panics on an empty trajectory.
    pub fn advance(&mut self, relative: &Pose2D) -> Pose2D {
        let last = *self.poses.last().expect("trajectory not started");
        let pose = last.compose(relative);
        self.poses.push(pose);
        pose
    }

    /// Repeat the previous pose for a scan whose registration failed.
    ///
    /// # Panics
    /// Panics on an empty trajectory.
    pub fn repeat_last(&mut self) -> Pose2D {
        let last = *self.poses.last().expect("trajectory not started");
        self.poses.push(last);
        last
    }

    /// Most recent absolute pose.
    pub fn current(&self) -> Option<Pose2D> {
        self.poses.last().copied()
    }

    /// All poses, oldest first.
    pub fn poses(&self) -> &[Pose2D] {
        &self.poses
    }

    /// Number of poses.
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// True before the first scan.
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}
