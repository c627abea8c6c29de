//! Polar to Cartesian projection.

use crate::core::types::{CanonicalScan, PointCloud2D};

/// Projects canonical scans into the sensor-local Cartesian frame.
///
/// Null ranges contribute no point at all; emitting a point at the origin
/// for them would drag the centroid used by registration.
#[derive(Debug, Clone, Copy)]
pub struct ScanProjector {
    /// Multiplier from millimetres to the output unit (0.001 = meters)
    unit_factor: f32,
}

impl ScanProjector {
    /// Create a projector with the given unit factor.
    pub fn new(unit_factor: f32) -> Self {
        Self { unit_factor }
    }

    /// Project every valid canonical entry to `(r·cos θ, r·sin θ)`.
    ///
    /// Output ordering follows the canonical angle ordering.
    pub fn project(&self, scan: &CanonicalScan) -> PointCloud2D {
        let mut cloud = PointCloud2D::with_capacity(scan.len());
        for (i, range) in scan.ranges.iter().enumerate() {
            let Some(mm) = range else { continue };
            let r = mm * self.unit_factor;
            let (sin_a, cos_a) = scan.angle_at(i).to_radians().sin_cos();
            cloud.push_xy(r * cos_a, r * sin_a);
        }
        cloud
    }
}
