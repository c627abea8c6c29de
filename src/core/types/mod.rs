//! Core data types shared across the pipeline.

mod pose;
mod scan;
mod timestamped;

pub use pose::{Point2D, Pose2D};
pub use scan::{CanonicalScan, PointCloud2D, RawScan, ScanGeometry};
pub use timestamped::Timestamped;
