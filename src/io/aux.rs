//! Boundary types for the auxiliary GNSS/IMU collaborator.
//!
//! The correction pipeline (observation decoding, RTK classification, NTRIP
//! relay) lives outside this crate. What crosses the boundary is a small
//! tagged message type the pipeline matches explicitly; the core consumes at
//! most a timestamp and a coarse pose hint from it.

use serde::{Deserialize, Serialize};

/// Message kinds accepted from the auxiliary positioning stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AuxMessage {
    /// Absolute time reference for stamping scans.
    TimePulse {
        /// Unix time in microseconds
        unix_time_us: u64,
    },
    /// Coarse absolute pose from the external positioning solution.
    ///
    /// Recorded alongside the odometry estimate; it does not steer
    /// registration.
    PositionFix {
        /// X position in output units
        x: f32,
        /// Y position in output units
        y: f32,
        /// Heading in radians
        heading_rad: f32,
    },
}
