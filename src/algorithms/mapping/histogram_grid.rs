//! Count-histogram occupancy map.
//!
//! Every registered scan's world-frame points are binned into a fixed
//! resolution grid; cell values are plain occurrence counts. Accumulation is
//! monotonic: there is no decay, eviction or free-space carving.

use crate::core::types::PointCloud2D;
use serde::{Deserialize, Serialize};

/// World-frame extent of a grid: `[min_x, min_y, max_x, max_y]`.
pub type Extent = [f32; 4];

/// 2D histogram over world-frame coordinates.
///
/// Row-major storage, `index = cy * width + cx`, cell (0, 0) at the
/// minimum-x/minimum-y corner.
#[derive(Debug, Clone)]
pub struct HistogramGrid {
    resolution: f32,
    width: usize,
    height: usize,
    origin_x: f32,
    origin_y: f32,
    cells: Vec<u32>,
    total_points: u64,
    out_of_extent: u64,
}

impl HistogramGrid {
    /// Grid with a pre-set square extent centred on the origin.
    ///
    /// The streaming constructor: the final bounding box cannot be known in
    /// advance, so the extent comes from configuration.
    pub fn new_centered(resolution: f32, half_extent: f32) -> Self {
        Self::with_extent(resolution, [-half_extent, -half_extent, half_extent, half_extent])
    }

    /// Grid with an explicit extent.
    pub fn with_extent(resolution: f32, extent: Extent) -> Self {
        let [min_x, min_y, max_x, max_y] = extent;
        let width = (((max_x - min_x) / resolution).ceil() as usize).max(1);
        let height = (((max_y - min_y) / resolution).ceil() as usize).max(1);
        Self {
            resolution,
            width,
            height,
            origin_x: min_x,
            origin_y: min_y,
            cells: vec![0; width * height],
            total_points: 0,
            out_of_extent: 0,
        }
    }

    /// Grid sized once from a point set's bounding box plus padding.
    ///
    /// The batch constructor, for offline runs where all points are known.
    pub fn from_points(points: &PointCloud2D, resolution: f32, padding: f32) -> Option<Self> {
        let (min, max) = points.bounds()?;
        let mut grid = Self::with_extent(
            resolution,
            [
                min.x - padding,
                min.y - padding,
                max.x + padding,
                max.y + padding,
            ],
        );
        grid.accumulate(points);
        Some(grid)
    }

    /// Bin a cloud of world-frame points into the histogram.
    ///
    /// Points outside the extent are counted but not binned; counts
    /// saturate instead of wrapping.
    pub fn accumulate(&mut self, cloud: &PointCloud2D) {
        for i in 0..cloud.len() {
            match self.world_to_cell(cloud.xs[i], cloud.ys[i]) {
                Some((cx, cy)) => {
                    let idx = cy * self.width + cx;
                    self.cells[idx] = self.cells[idx].saturating_add(1);
                    self.total_points += 1;
                }
                None => self.out_of_extent += 1,
            }
        }
    }

    /// Convert world coordinates to cell indices.
    ///
    /// Returns `None` outside the grid extent.
    #[inline]
    pub fn world_to_cell(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let cx = ((x - self.origin_x) / self.resolution).floor();
        let cy = ((y - self.origin_y) / self.resolution).floor();
        if cx >= 0.0 && cy >= 0.0 {
            let cx = cx as usize;
            let cy = cy as usize;
            if cx < self.width && cy < self.height {
                return Some((cx, cy));
            }
        }
        None
    }

    /// World coordinates of a cell's centre.
    #[inline]
    pub fn cell_to_world(&self, cx: usize, cy: usize) -> (f32, f32) {
        (
            self.origin_x + (cx as f32 + 0.5) * self.resolution,
            self.origin_y + (cy as f32 + 0.5) * self.resolution,
        )
    }

    /// Count at a cell, 0 when out of bounds.
    #[inline]
    pub fn count_at(&self, cx: usize, cy: usize) -> u32 {
        if cx < self.width && cy < self.height {
            self.cells[cy * self.width + cx]
        } else {
            0
        }
    }

    /// Grid width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Cell size in output units.
    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    /// World-frame extent.
    pub fn extent(&self) -> Extent {
        [
            self.origin_x,
            self.origin_y,
            self.origin_x + self.width as f32 * self.resolution,
            self.origin_y + self.height as f32 * self.resolution,
        ]
    }

    /// Points binned so far.
    pub fn total_points(&self) -> u64 {
        self.total_points
    }

    /// Points that fell outside the extent.
    pub fn out_of_extent(&self) -> u64 {
        self.out_of_extent
    }

    /// Immutable copy of the grid for visualization or export.
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            resolution: self.resolution,
            extent: self.extent(),
            width: self.width,
            height: self.height,
            cells: self.cells.clone(),
        }
    }
}

/// Read-only view of a [`HistogramGrid`] at a moment in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSnapshot {
    /// Cell size in output units
    pub resolution: f32,
    /// `[min_x, min_y, max_x, max_y]`
    pub extent: Extent,
    /// Width in cells
    pub width: usize,
    /// Height in cells
    pub height: usize,
    /// Row-major counts
    pub cells: Vec<u32>,
}
