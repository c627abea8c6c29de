//! disha-odom — scan-matching odometry for TiM-class 2D LiDAR scanners.
//!
//! Ingests CoLa-A ASCII telegrams over TCP, turns each telegram into a
//! calibrated point cloud, estimates frame-to-frame motion with
//! point-to-point ICP, chains the relative transforms into a trajectory and
//! accumulates the registered points into a 2D histogram map.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      bin/                           │  ← Executable
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Transport & artifacts
//! │            (tim client, export, aux)                │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │           (pipeline, trajectory, offline)           │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  algorithms/                        │  ← Core algorithms
//! │               (matching, mapping)                   │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   sensors/                          │  ← Scan preprocessing
//! │             (resampler, projector)                  │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                 (types, math)                       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Data flow per scan: raw bytes → framer → decoder → resampler → projector
//! → matcher (against the previous cloud) → pose chain → map builder. The
//! whole chain runs on one thread; concurrent readers see atomically-swapped
//! immutable snapshots only.

pub mod config;
pub mod core;
pub mod error;

pub mod sensors;

pub mod algorithms;

pub mod engine;

pub mod io;

// Convenience re-exports (flat namespace for common use)

pub use error::{Error, Result};

pub use config::{AppConfig, CanonicalGeometry, DeviceConfig, IcpConfig, MapConfig};
pub use crate::core::math;
pub use crate::core::types::{CanonicalScan, PointCloud2D, RawScan, ScanGeometry};
pub use crate::core::types::{Point2D, Pose2D, Timestamped};

pub use sensors::preprocessing::{AngularResampler, ScanProjector};

pub use algorithms::mapping::{GridSnapshot, HistogramGrid};
pub use algorithms::matching::{
    BruteForceIndex, KdTreeIndex, MatchResult, NearestNeighbor, PointToPointIcp, ScanMatcher,
};

pub use engine::{
    run_offline, run_stream, OdometryPipeline, OfflineConfig, OfflineResult, PipelineCounters,
    ScanOutput, SharedView, Trajectory,
};

pub use io::aux::AuxMessage;
pub use io::export::{ScanRecord, ScanRecordWriter, TrajectoryRecord};
pub use io::tim::{decode_scan, TelegramFramer, TimClient};
