//! Configuration for the odometry pipeline.
//!
//! Loaded from a TOML file. Canonical scan geometry and device limits are
//! configuration, not constants: observed devices disagree on span and point
//! count, so nothing here is hard-coded in the pipeline.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub connection: ConnectionConfig,
    pub device: DeviceConfig,
    pub canonical: CanonicalGeometry,
    pub icp: IcpConfig,
    pub map: MapConfig,
    pub output: OutputConfig,
}

/// Scanner TCP endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Scanner service address, e.g. `192.168.0.1:2111`
    pub address: String,
    /// Socket read timeout in milliseconds; a timeout means "no data this
    /// cycle", not an error
    pub read_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: "192.168.0.1:2111".to_string(),
            read_timeout_ms: 200,
        }
    }
}

/// Device decode limits and nominal geometry fallback.
///
/// The nominal fields are used only when a telegram omits or mangles its
/// on-wire geometry header; a well-formed header always wins.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Shortest credible return in millimetres
    pub min_valid_mm: u32,
    /// Longest credible return in millimetres
    pub max_valid_mm: u32,
    /// Documented start angle in degrees (fallback)
    pub nominal_start_deg: f32,
    /// Documented angular step in degrees (fallback)
    pub nominal_step_deg: f32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            min_valid_mm: 50,
            max_valid_mm: 25_000,
            nominal_start_deg: -45.0,
            nominal_step_deg: 0.3333,
        }
    }
}

/// Fixed canonical angular grid every scan is resampled onto.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct CanonicalGeometry {
    /// First canonical angle in degrees
    pub start_deg: f32,
    /// Last canonical angle in degrees (inclusive)
    pub end_deg: f32,
    /// Number of canonical samples
    pub point_count: usize,
}

impl Default for CanonicalGeometry {
    fn default() -> Self {
        Self {
            start_deg: -45.0,
            end_deg: 225.0,
            point_count: 811,
        }
    }
}

impl CanonicalGeometry {
    /// Canonical angular spacing in degrees.
    pub fn step_deg(&self) -> f32 {
        if self.point_count > 1 {
            (self.end_deg - self.start_deg) / (self.point_count - 1) as f32
        } else {
            0.0
        }
    }

    /// Validate the grid parameters.
    pub fn validate(&self) -> Result<()> {
        if self.point_count == 0 {
            return Err(Error::Config("canonical point_count must be >= 1".into()));
        }
        if self.point_count > 1 && self.end_deg <= self.start_deg {
            return Err(Error::Config(
                "canonical end_deg must exceed start_deg".into(),
            ));
        }
        Ok(())
    }
}

/// Scan matcher parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IcpConfig {
    /// Iteration cap
    pub max_iterations: u32,
    /// Convergence tolerance on the change in mean residual distance
    pub residual_tolerance: f32,
    /// Quantile of squared correspondence distances kept per iteration
    /// (0.95 discards the worst 5%)
    pub outlier_quantile: f32,
    /// Scans with fewer projected points than this are not matched
    pub min_points_per_scan: usize,
    /// Use the brute-force nearest-neighbour search instead of the k-d tree
    pub brute_force_nn: bool,
}

impl Default for IcpConfig {
    fn default() -> Self {
        Self {
            max_iterations: 40,
            residual_tolerance: 1e-4,
            outlier_quantile: 0.95,
            min_points_per_scan: 50,
            brute_force_nn: false,
        }
    }
}

/// Histogram map parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MapConfig {
    /// Cell size in output units
    pub resolution: f32,
    /// Pre-set extent for streaming use: half-width of the square region
    /// centred on the start pose
    pub half_extent: f32,
    /// Padding added around the accumulated bounding box in batch mode
    pub padding: f32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            resolution: 0.05,
            half_extent: 30.0,
            padding: 2.0,
        }
    }
}

/// Output artifact settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Multiplier from millimetres to the output unit (0.001 = meters)
    pub unit_factor: f32,
    /// NDJSON scan record path; empty disables scan export
    pub scan_path: String,
    /// Trajectory JSON path; empty disables trajectory export
    pub trajectory_path: String,
    /// Grid JSON path; empty disables grid export
    pub grid_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            unit_factor: 0.001,
            scan_path: "scans.ndjson".to_string(),
            trajectory_path: "trajectory.json".to_string(),
            grid_path: "grid.json".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.canonical.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
