//! Orchestration layer: pose chaining and the per-scan pipeline.

pub mod offline;
pub mod pipeline;
pub mod trajectory;

pub use offline::{run_offline, OfflineConfig, OfflineResult};
pub use pipeline::{
    run_stream, LiveState, OdometryPipeline, PipelineCounters, ScanOutput, SharedView,
};
pub use trajectory::Trajectory;
