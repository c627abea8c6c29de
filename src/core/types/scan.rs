//! Scan and point cloud types.

use super::pose::{Point2D, Pose2D};
use serde::{Deserialize, Serialize};

/// Angular layout of a decoded scan telegram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanGeometry {
    /// First sample angle in degrees
    pub start_angle_deg: f32,
    /// Angular spacing between consecutive samples in degrees
    pub step_deg: f32,
    /// Declared number of samples
    pub sample_count: usize,
}

impl ScanGeometry {
    /// Create a geometry, validating its invariants.
    pub fn new(start_angle_deg: f32, step_deg: f32, sample_count: usize) -> crate::Result<Self> {
        if step_deg <= 0.0 {
            return Err(crate::Error::InvalidTelegram(format!(
                "non-positive angular step: {step_deg}"
            )));
        }
        if sample_count == 0 {
            return Err(crate::Error::InvalidTelegram(
                "zero sample count".to_string(),
            ));
        }
        Ok(Self {
            start_angle_deg,
            step_deg,
            sample_count,
        })
    }

    /// Angle of sample `i` in degrees.
    #[inline]
    pub fn angle_at(&self, i: usize) -> f32 {
        self.start_angle_deg + i as f32 * self.step_deg
    }

    /// Angular span covered by the declared samples, in degrees.
    #[inline]
    pub fn span_deg(&self) -> f32 {
        self.step_deg * (self.sample_count.saturating_sub(1)) as f32
    }
}

/// One decoded scan telegram: geometry plus raw range samples.
///
/// Samples are millimetres; `None` marks an invalid return (zero, outside
/// the device's valid window, or unparsable on the wire). Invalid samples
/// are never stored as zero — a zero would poison centroid-based
/// registration downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawScan {
    /// Angular layout declared on the wire (or the nominal fallback)
    pub geometry: ScanGeometry,
    /// Range samples in millimetres, `None` = invalid
    pub samples: Vec<Option<u32>>,
    /// Set when the telegram carried fewer sample tokens than declared
    pub short_frame: bool,
}

impl RawScan {
    /// Number of valid samples.
    pub fn valid_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_some()).count()
    }

    /// Iterate over `(angle_deg, range_mm)` for valid samples only.
    pub fn iter_valid(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.samples
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|mm| (self.geometry.angle_at(i), mm as f32)))
    }
}

/// A scan resampled onto the fixed canonical angular grid.
///
/// Every canonical scan for a given device configuration has identical
/// length and angular layout; ranges stay in millimetres with `None`
/// carried through for invalid regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalScan {
    /// First canonical angle in degrees
    pub start_angle_deg: f32,
    /// Canonical angular spacing in degrees
    pub step_deg: f32,
    /// Interpolated ranges in millimetres, index-aligned with the grid
    pub ranges: Vec<Option<f32>>,
}

impl CanonicalScan {
    /// Angle of canonical entry `i` in degrees.
    #[inline]
    pub fn angle_at(&self, i: usize) -> f32 {
        self.start_angle_deg + i as f32 * self.step_deg
    }

    /// Number of canonical entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Check if the scan has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of entries carrying a range.
    pub fn valid_count(&self) -> usize {
        self.ranges.iter().filter(|r| r.is_some()).count()
    }
}

/// Collection of 2D points in Struct-of-Arrays layout.
///
/// One point per canonical entry with a non-null range; ordering follows
/// the canonical angle ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PointCloud2D {
    /// X coordinates
    pub xs: Vec<f32>,
    /// Y coordinates
    pub ys: Vec<f32>,
}

impl PointCloud2D {
    /// Create an empty point cloud.
    pub fn new() -> Self {
        Self {
            xs: Vec::new(),
            ys: Vec::new(),
        }
    }

    /// Create a point cloud with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            xs: Vec::with_capacity(capacity),
            ys: Vec::with_capacity(capacity),
        }
    }

    /// Build from a slice of points.
    pub fn from_points(points: &[Point2D]) -> Self {
        let mut cloud = Self::with_capacity(points.len());
        for p in points {
            cloud.push_xy(p.x, p.y);
        }
        cloud
    }

    /// Add a point by coordinates.
    #[inline]
    pub fn push_xy(&mut self, x: f32, y: f32) {
        self.xs.push(x);
        self.ys.push(y);
    }

    /// Add a point.
    #[inline]
    pub fn push(&mut self, point: Point2D) {
        self.push_xy(point.x, point.y);
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Point at index.
    ///
    /// # Panics
    /// Panics if index is out of bounds.
    #[inline]
    pub fn point_at(&self, i: usize) -> Point2D {
        Point2D::new(self.xs[i], self.ys[i])
    }

    /// Iterate over points.
    pub fn iter(&self) -> impl Iterator<Item = Point2D> + '_ {
        self.xs
            .iter()
            .zip(self.ys.iter())
            .map(|(&x, &y)| Point2D::new(x, y))
    }

    /// Axis-aligned bounding box, `None` when empty.
    pub fn bounds(&self) -> Option<(Point2D, Point2D)> {
        if self.is_empty() {
            return None;
        }
        let mut min = Point2D::new(f32::MAX, f32::MAX);
        let mut max = Point2D::new(f32::MIN, f32::MIN);
        for i in 0..self.len() {
            min.x = min.x.min(self.xs[i]);
            min.y = min.y.min(self.ys[i]);
            max.x = max.x.max(self.xs[i]);
            max.y = max.y.max(self.ys[i]);
        }
        Some((min, max))
    }

    /// Center of mass, `None` when empty.
    pub fn centroid(&self) -> Option<Point2D> {
        if self.is_empty() {
            return None;
        }
        let inv_n = 1.0 / self.len() as f32;
        let sum_x: f32 = self.xs.iter().sum();
        let sum_y: f32 = self.ys.iter().sum();
        Some(Point2D::new(sum_x * inv_n, sum_y * inv_n))
    }

    /// Transform all points by a pose (local frame to world frame).
    pub fn transform(&self, pose: &Pose2D) -> PointCloud2D {
        let (sin_t, cos_t) = pose.theta.sin_cos();
        let mut result = PointCloud2D::with_capacity(self.len());
        for i in 0..self.len() {
            result.push_xy(
                pose.x + self.xs[i] * cos_t - self.ys[i] * sin_t,
                pose.y + self.xs[i] * sin_t + self.ys[i] * cos_t,
            );
        }
        result
    }

    /// In-place variant of [`transform`](Self::transform).
    pub fn transform_mut(&mut self, pose: &Pose2D) {
        let (sin_t, cos_t) = pose.theta.sin_cos();
        for i in 0..self.len() {
            let x = self.xs[i];
            let y = self.ys[i];
            self.xs[i] = pose.x + x * cos_t - y * sin_t;
            self.ys[i] = pose.y + x * sin_t + y * cos_t;
        }
    }
}
