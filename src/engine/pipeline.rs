//! Streaming orchestration: bytes in, poses and map updates out.
//!
//! One pipeline instance owns every mutable piece of state — framer buffer,
//! previous cloud, trajectory, grid, counters — and is driven by a single
//! thread. Concurrent consumers (visualization, exporters on other threads)
//! read atomically-swapped immutable snapshots through [`SharedView`] and
//! never touch the live structures.

use crate::algorithms::mapping::{GridSnapshot, HistogramGrid};
use crate::algorithms::matching::{
    BruteForceIndex, KdTreeIndex, MatchResult, PointToPointIcp, ScanMatcher,
};
use crate::config::AppConfig;
use crate::core::types::{PointCloud2D, Pose2D, RawScan};
use crate::engine::trajectory::Trajectory;
use crate::error::{Error, Result};
use crate::io::aux::AuxMessage;
use crate::io::tim::{decode_scan, TelegramFramer};
use crate::sensors::preprocessing::{AngularResampler, ScanProjector};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Per-run event counters, observable without interrupting the stream.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PipelineCounters {
    /// Complete telegrams extracted from the byte stream
    pub frames_seen: u64,
    /// Telegrams that were not scan data
    pub non_scan_frames: u64,
    /// Scan telegrams dropped for decode errors
    pub dropped_frames: u64,
    /// Scan telegrams carrying fewer samples than declared
    pub short_frames: u64,
    /// Scans skipped for having too few projected points
    pub sparse_scans: u64,
    /// Registrations that failed and held the previous pose
    pub failed_registrations: u64,
    /// Scans that produced a pose
    pub scans_processed: u64,
}

/// Everything produced by processing one accepted scan.
#[derive(Debug, Clone)]
pub struct ScanOutput {
    /// Sequence number among accepted scans
    pub seq: u64,
    /// Capture timestamp in microseconds since epoch
    pub timestamp_us: u64,
    /// Absolute pose of this scan
    pub pose: Pose2D,
    /// Points in the world frame
    pub world_points: PointCloud2D,
    /// True when the matcher failed and the pose was held
    pub registration_failed: bool,
}

/// Immutable per-scan state published for concurrent readers.
#[derive(Debug, Clone, Default)]
pub struct LiveState {
    /// Sequence number of the latest accepted scan
    pub seq: u64,
    /// Timestamp of the latest accepted scan
    pub timestamp_us: u64,
    /// Current absolute pose
    pub pose: Pose2D,
    /// Latest world-frame cloud
    pub world_points: PointCloud2D,
    /// Latest auxiliary position fix, if any arrived
    pub aux_pose: Option<Pose2D>,
    /// Counter values at publish time
    pub counters: PipelineCounters,
}

/// Atomically-swapped snapshots for readers outside the pipeline thread.
///
/// The light per-scan state swaps on every accepted scan; the grid snapshot
/// swaps only when the driver calls [`OdometryPipeline::publish_map`], which
/// decouples processing rate from rendering rate.
#[derive(Default)]
pub struct SharedView {
    live: RwLock<Arc<LiveState>>,
    map: RwLock<Option<Arc<GridSnapshot>>>,
}

impl SharedView {
    /// Latest per-scan state.
    pub fn live(&self) -> Arc<LiveState> {
        self.live.read().clone()
    }

    /// Latest published grid snapshot, if any.
    pub fn map(&self) -> Option<Arc<GridSnapshot>> {
        self.map.read().clone()
    }
}

/// The streaming odometry pipeline.
pub struct OdometryPipeline {
    framer: TelegramFramer,
    resampler: AngularResampler,
    projector: ScanProjector,
    matcher: Box<dyn ScanMatcher + Send>,
    config: AppConfig,
    trajectory: Trajectory,
    grid: HistogramGrid,
    previous_cloud: Option<PointCloud2D>,
    counters: PipelineCounters,
    shared: Arc<SharedView>,
    time_hint_us: Option<u64>,
    aux_pose: Option<Pose2D>,
    seq: u64,
}

impl OdometryPipeline {
    /// Build a pipeline from configuration.
    pub fn new(config: AppConfig) -> Result<Self> {
        config.canonical.validate()?;

        let matcher: Box<dyn ScanMatcher + Send> = if config.icp.brute_force_nn {
            Box::new(PointToPointIcp::<BruteForceIndex>::new(config.icp.clone()))
        } else {
            Box::new(PointToPointIcp::<KdTreeIndex>::new(config.icp.clone()))
        };

        Ok(Self {
            framer: TelegramFramer::new(),
            resampler: AngularResampler::new(config.canonical),
            projector: ScanProjector::new(config.output.unit_factor),
            matcher,
            grid: HistogramGrid::new_centered(config.map.resolution, config.map.half_extent),
            config,
            trajectory: Trajectory::new(),
            previous_cloud: None,
            counters: PipelineCounters::default(),
            shared: Arc::new(SharedView::default()),
            time_hint_us: None,
            aux_pose: None,
            seq: 0,
        })
    }

    /// Handle for concurrent snapshot readers.
    pub fn shared_view(&self) -> Arc<SharedView> {
        Arc::clone(&self.shared)
    }

    /// Feed a chunk of raw socket bytes.
    ///
    /// Drains every complete telegram it uncovers and returns one output per
    /// accepted scan. Decode problems drop the offending frame and keep the
    /// stream alive.
    pub fn handle_bytes(&mut self, chunk: &[u8]) -> Vec<ScanOutput> {
        self.framer.push_bytes(chunk);
        let mut outputs = Vec::new();
        while let Some(frame) = self.framer.next_frame() {
            self.counters.frames_seen += 1;
            match self.process_frame(&frame) {
                Ok(Some(output)) => outputs.push(output),
                Ok(None) => {}
                Err(Error::NotAScan) => self.counters.non_scan_frames += 1,
                Err(e) => {
                    self.counters.dropped_frames += 1;
                    log::warn!("dropping telegram: {e}");
                }
            }
        }
        outputs
    }

    /// Feed messages from the auxiliary positioning collaborator.
    pub fn apply_aux(&mut self, msg: AuxMessage) {
        match msg {
            AuxMessage::TimePulse { unix_time_us } => self.time_hint_us = Some(unix_time_us),
            AuxMessage::PositionFix { x, y, heading_rad } => {
                self.aux_pose = Some(Pose2D::new(x, y, heading_rad));
            }
        }
    }

    /// Decode and process one framed telegram.
    fn process_frame(&mut self, frame: &[u8]) -> Result<Option<ScanOutput>> {
        let raw = decode_scan(frame, &self.config.device)?;
        Ok(self.process_scan(raw))
    }

    /// Run one decoded scan through resample → project → match → map.
    pub fn process_scan(&mut self, raw: RawScan) -> Option<ScanOutput> {
        if raw.short_frame {
            self.counters.short_frames += 1;
        }

        let canonical = self.resampler.resample(&raw);
        let local = self.projector.project(&canonical);

        if local.len() < self.config.icp.min_points_per_scan {
            self.counters.sparse_scans += 1;
            log::debug!(
                "skipping sparse scan: {} points (minimum {})",
                local.len(),
                self.config.icp.min_points_per_scan
            );
            return None;
        }

        let (pose, registration_failed) = match &self.previous_cloud {
            None => (self.trajectory.start_at_origin(), false),
            Some(previous) => {
                let result: MatchResult = self.matcher.match_scans(&local, previous);
                if result.is_usable() {
                    log::trace!(
                        "registration: {} iterations, residual {:.5}",
                        result.iterations,
                        result.mean_error
                    );
                    (self.trajectory.advance(&result.transform), false)
                } else {
                    self.counters.failed_registrations += 1;
                    log::warn!("registration failed, holding previous pose");
                    (self.trajectory.repeat_last(), true)
                }
            }
        };

        let world_points = local.transform(&pose);
        self.grid.accumulate(&world_points);
        self.previous_cloud = Some(local);

        let output = ScanOutput {
            seq: self.seq,
            timestamp_us: self.timestamp_us(),
            pose,
            world_points,
            registration_failed,
        };
        self.seq += 1;
        self.counters.scans_processed += 1;
        self.publish_live(&output);
        Some(output)
    }

    fn timestamp_us(&self) -> u64 {
        self.time_hint_us.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_micros() as u64)
                .unwrap_or(0)
        })
    }

    fn publish_live(&self, output: &ScanOutput) {
        let state = Arc::new(LiveState {
            seq: output.seq,
            timestamp_us: output.timestamp_us,
            pose: output.pose,
            world_points: output.world_points.clone(),
            aux_pose: self.aux_pose,
            counters: self.counters,
        });
        *self.shared.live.write() = state;
    }

    /// Swap a fresh grid snapshot into the shared view.
    ///
    /// Called by the driver at its own cadence; the grid itself is only
    /// mutated by the pipeline thread.
    pub fn publish_map(&self) {
        *self.shared.map.write() = Some(Arc::new(self.grid.snapshot()));
    }

    /// Current counters.
    pub fn counters(&self) -> &PipelineCounters {
        &self.counters
    }

    /// The pose chain so far.
    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// The live grid (pipeline thread only; concurrent readers go through
    /// [`SharedView`]).
    pub fn grid(&self) -> &HistogramGrid {
        &self.grid
    }

    /// Finish the stream: drop any unterminated partial telegram and leave
    /// trajectory and grid in their final consistent state.
    pub fn finish(&mut self) {
        self.framer.discard_partial();
        self.publish_map();
        log::info!(
            "pipeline finished: {} scans, {} short frames, {} dropped, {} failed registrations",
            self.counters.scans_processed,
            self.counters.short_frames,
            self.counters.dropped_frames,
            self.counters.failed_registrations
        );
    }
}

/// Drive a pipeline from a reader loop until `stop` is raised or the
/// connection fails.
///
/// A read timeout is "no data this cycle", never an error. Once `stop` is
/// observed the in-flight chunk finishes processing before the function
/// returns, so the map never holds half a scan.
pub fn run_stream<F>(
    pipeline: &mut OdometryPipeline,
    stop: &AtomicBool,
    mut read_chunk: impl FnMut(&mut [u8]) -> Result<Option<usize>>,
    mut on_scan: F,
) -> Result<()>
where
    F: FnMut(&ScanOutput) -> Result<()>,
{
    let mut buf = [0u8; 65536];
    let result = loop {
        if stop.load(Ordering::Relaxed) {
            log::info!("stop requested, finishing stream");
            break Ok(());
        }
        match read_chunk(&mut buf) {
            Ok(Some(n)) => {
                for output in pipeline.handle_bytes(&buf[..n]) {
                    on_scan(&output)?;
                }
            }
            Ok(None) => continue,
            Err(Error::Disconnected) => {
                log::info!("scanner closed the connection");
                break Ok(());
            }
            Err(e) => break Err(e),
        }
    };
    pipeline.finish();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::tim::{ETX, STX};
    use approx::assert_relative_eq;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        // coarse canonical grid keeps synthetic telegrams small
        config.canonical.point_count = 181;
        config.icp.min_points_per_scan = 20;
        config
    }

    /// Build a framed scan telegram from ranges in millimetres.
    fn telegram(ranges_mm: &[u32]) -> Vec<u8> {
        let mut text = format!(
            "sSN LMDscandata 1 1 0 0 DIST1 3F800000 00000000 FFF92230 {:X} {:X}",
            // step chosen so the samples span the full 270° fan
            (2_700_000 / (ranges_mm.len() as u32 - 1).max(1)),
            ranges_mm.len()
        );
        for r in ranges_mm {
            text.push_str(&format!(" {r:X}"));
        }
        let mut frame = vec![STX];
        frame.extend_from_slice(text.as_bytes());
        frame.push(ETX);
        frame
    }

    /// A room-like range profile with wall structure.
    fn room_ranges(n: usize) -> Vec<u32> {
        (0..n)
            .map(|i| {
                let angle = -45.0 + 270.0 * i as f32 / (n - 1) as f32;
                let wobble = 800.0 * (angle.to_radians() * 3.0).sin();
                (4000.0 + wobble) as u32
            })
            .collect()
    }

    #[test]
    fn test_first_scan_anchors_at_origin() {
        let mut pipeline = OdometryPipeline::new(test_config()).unwrap();
        let outputs = pipeline.handle_bytes(&telegram(&room_ranges(181)));

        assert_eq!(outputs.len(), 1);
        assert_relative_eq!(outputs[0].pose.x, 0.0);
        assert_relative_eq!(outputs[0].pose.theta, 0.0);
        assert_eq!(pipeline.trajectory().len(), 1);
    }

    #[test]
    fn test_identical_scans_stay_at_origin() {
        let mut pipeline = OdometryPipeline::new(test_config()).unwrap();
        let frame = telegram(&room_ranges(181));
        pipeline.handle_bytes(&frame);
        let outputs = pipeline.handle_bytes(&frame);

        assert_eq!(outputs.len(), 1);
        assert_relative_eq!(outputs[0].pose.x, 0.0, epsilon = 0.02);
        assert_relative_eq!(outputs[0].pose.y, 0.0, epsilon = 0.02);
        assert_relative_eq!(outputs[0].pose.theta, 0.0, epsilon = 0.02);
    }

    #[test]
    fn test_chunked_delivery_equals_single_frame() {
        let mut pipeline = OdometryPipeline::new(test_config()).unwrap();
        let frame = telegram(&room_ranges(181));

        let mut outputs = Vec::new();
        for chunk in frame.chunks(7) {
            outputs.extend(pipeline.handle_bytes(chunk));
        }
        assert_eq!(outputs.len(), 1);
        assert_eq!(pipeline.counters().frames_seen, 1);
    }

    #[test]
    fn test_non_scan_frames_are_counted_not_fatal() {
        let mut pipeline = OdometryPipeline::new(test_config()).unwrap();
        let mut data = vec![STX];
        data.extend_from_slice(b"sAN SetAccessMode 1");
        data.push(ETX);
        data.extend_from_slice(&telegram(&room_ranges(181)));

        let outputs = pipeline.handle_bytes(&data);
        assert_eq!(outputs.len(), 1);
        assert_eq!(pipeline.counters().non_scan_frames, 1);
        assert_eq!(pipeline.counters().frames_seen, 2);
    }

    #[test]
    fn test_all_invalid_scan_contributes_nothing() {
        let mut pipeline = OdometryPipeline::new(test_config()).unwrap();
        // every sample out of range (1mm < min_valid)
        let outputs = pipeline.handle_bytes(&telegram(&vec![1u32; 181]));

        assert!(outputs.is_empty());
        assert_eq!(pipeline.counters().sparse_scans, 1);
        assert_eq!(pipeline.grid().total_points(), 0);
        assert!(pipeline.trajectory().is_empty());
    }

    #[test]
    fn test_aux_time_hint_stamps_scans() {
        let mut pipeline = OdometryPipeline::new(test_config()).unwrap();
        pipeline.apply_aux(AuxMessage::TimePulse {
            unix_time_us: 42_000_000,
        });
        let outputs = pipeline.handle_bytes(&telegram(&room_ranges(181)));
        assert_eq!(outputs[0].timestamp_us, 42_000_000);
    }

    #[test]
    fn test_aux_pose_lands_in_live_state() {
        let mut pipeline = OdometryPipeline::new(test_config()).unwrap();
        let view = pipeline.shared_view();
        pipeline.apply_aux(AuxMessage::PositionFix {
            x: 3.0,
            y: 4.0,
            heading_rad: 0.1,
        });
        pipeline.handle_bytes(&telegram(&room_ranges(181)));

        let live = view.live();
        let aux = live.aux_pose.unwrap();
        assert_relative_eq!(aux.x, 3.0);
        assert_relative_eq!(aux.y, 4.0);
    }

    #[test]
    fn test_map_accumulates_and_snapshot_publishes() {
        let mut pipeline = OdometryPipeline::new(test_config()).unwrap();
        let view = pipeline.shared_view();
        pipeline.handle_bytes(&telegram(&room_ranges(181)));

        assert!(pipeline.grid().total_points() > 0);
        assert!(view.map().is_none());
        pipeline.publish_map();
        let snap = view.map().unwrap();
        assert!(snap.cells.iter().any(|&c| c > 0));
    }

    #[test]
    fn test_run_stream_stops_on_disconnect() {
        let mut pipeline = OdometryPipeline::new(test_config()).unwrap();
        let stop = AtomicBool::new(false);
        let frame = telegram(&room_ranges(181));
        let mut served = false;

        let mut scans = 0usize;
        run_stream(
            &mut pipeline,
            &stop,
            |buf| {
                if served {
                    return Err(Error::Disconnected);
                }
                served = true;
                buf[..frame.len()].copy_from_slice(&frame);
                Ok(Some(frame.len()))
            },
            |_| {
                scans += 1;
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(scans, 1);
        assert_eq!(pipeline.counters().scans_processed, 1);
        // finish() published the final map state
        assert!(pipeline.shared_view().map().is_some());
    }

    #[test]
    fn test_run_stream_honors_stop_flag() {
        let mut pipeline = OdometryPipeline::new(test_config()).unwrap();
        let stop = AtomicBool::new(true);

        run_stream(
            &mut pipeline,
            &stop,
            |_| panic!("must not read after stop"),
            |_| Ok(()),
        )
        .unwrap();
    }
}
