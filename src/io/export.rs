//! Serializable output artifacts.
//!
//! Three record shapes leave the pipeline for external visualization:
//! per-scan point clouds (NDJSON, one object per line so a run can be
//! tailed or replayed), the pose sequence, and the grid snapshot.

use crate::algorithms::mapping::GridSnapshot;
use crate::core::types::{PointCloud2D, Pose2D};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One scan's registered points, keyed by sequence number and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Scan sequence number
    pub seq: u64,
    /// Capture timestamp in microseconds since epoch
    pub timestamp_us: u64,
    /// Absolute pose at this scan
    pub pose: Pose2D,
    /// World-frame points
    pub points: PointCloud2D,
}

/// The full pose sequence of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    /// Absolute pose per accepted scan, oldest first
    pub poses: Vec<Pose2D>,
}

/// Streams scan records to an NDJSON file.
pub struct ScanRecordWriter {
    writer: BufWriter<File>,
}

impl ScanRecordWriter {
    /// Create or truncate the target file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
        })
    }

    /// Append one record as a single JSON line.
    pub fn write(&mut self, record: &ScanRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Flush buffered records to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Write the trajectory as a single JSON document.
pub fn write_trajectory<P: AsRef<Path>>(path: P, poses: &[Pose2D]) -> Result<()> {
    let record = TrajectoryRecord {
        poses: poses.to_vec(),
    };
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &record)?;
    writer.flush()?;
    Ok(())
}

/// Write a grid snapshot as a single JSON document.
pub fn write_grid<P: AsRef<Path>>(path: P, grid: &GridSnapshot) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, grid)?;
    writer.flush()?;
    Ok(())
}

/// Read scan records back from an NDJSON file.
///
/// Lines that fail to parse are skipped with a warning, so a file truncated
/// by an interrupted run still replays.
pub fn read_scan_records<P: AsRef<Path>>(path: P) -> Result<Vec<ScanRecord>> {
    let contents = std::fs::read_to_string(path)?;
    let mut records = Vec::new();
    for (lineno, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ScanRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("skipping unparsable scan record at line {}: {e}", lineno + 1),
        }
    }
    Ok(records)
}
