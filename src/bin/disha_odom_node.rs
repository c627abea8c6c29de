//! Live odometry capture daemon.
//!
//! Connects to the scanner, enables the telegram stream, runs the odometry
//! pipeline until Ctrl-C or disconnect, and writes the scan, trajectory and
//! grid artifacts on the way out.
//!
//! ```bash
//! # with the default config
//! disha_odom_node
//!
//! # with a custom config file and address override
//! disha_odom_node --config disha.toml --address 192.168.0.1:2111
//! ```

use clap::Parser;
use disha_odom::engine::{run_stream, OdometryPipeline};
use disha_odom::io::export::{write_grid, write_trajectory, ScanRecord, ScanRecordWriter};
use disha_odom::io::tim::TimClient;
use disha_odom::{AppConfig, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "disha_odom_node", about = "LiDAR scan-matching odometry capture")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Scanner address override, e.g. 192.168.0.1:2111
    #[arg(short, long)]
    address: Option<String>,

    /// Publish a map snapshot every N scans
    #[arg(long, default_value_t = 20)]
    map_publish_stride: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            log::info!("using config: {path}");
            AppConfig::from_file(path)?
        }
        None => AppConfig::default(),
    };
    if let Some(address) = args.address {
        config.connection.address = address;
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| disha_odom::Error::Other(format!("error setting Ctrl-C handler: {e}")))?;

    let mut client = TimClient::connect(
        &config.connection.address,
        Duration::from_millis(config.connection.read_timeout_ms),
    )?;
    client.start_streaming()?;

    let mut scan_writer = if config.output.scan_path.is_empty() {
        None
    } else {
        Some(ScanRecordWriter::create(&config.output.scan_path)?)
    };
    let trajectory_path = config.output.trajectory_path.clone();
    let grid_path = config.output.grid_path.clone();
    let map_stride = args.map_publish_stride.max(1);

    let mut pipeline = OdometryPipeline::new(config)?;

    log::info!("streaming; press Ctrl-C to stop");
    let result = run_stream(
        &mut pipeline,
        &running,
        |buf| client.read_chunk(buf),
        |output| {
            if output.seq % map_stride == 0 {
                log::info!(
                    "scan {}: pose ({:.3}, {:.3}, {:.3} rad)",
                    output.seq,
                    output.pose.x,
                    output.pose.y,
                    output.pose.theta
                );
            }
            if let Some(writer) = scan_writer.as_mut() {
                writer.write(&ScanRecord {
                    seq: output.seq,
                    timestamp_us: output.timestamp_us,
                    pose: output.pose,
                    points: output.world_points.clone(),
                })?;
            }
            Ok(())
        },
    );

    if let Err(e) = client.stop_streaming() {
        log::warn!("failed to stop scan stream: {e}");
    }

    // pipeline.finish() already ran inside run_stream; flush the artifacts
    if let Some(writer) = scan_writer.as_mut() {
        writer.flush()?;
    }
    if !trajectory_path.is_empty() {
        write_trajectory(&trajectory_path, pipeline.trajectory().poses())?;
        log::info!("trajectory written to {trajectory_path}");
    }
    if !grid_path.is_empty() {
        write_grid(&grid_path, &pipeline.grid().snapshot())?;
        log::info!("grid written to {grid_path}");
    }

    let counters = pipeline.counters();
    log::info!(
        "done: {} scans, {} frames seen, {} dropped, {} short, {} failed registrations",
        counters.scans_processed,
        counters.frames_seen,
        counters.dropped_frames,
        counters.short_frames,
        counters.failed_registrations
    );

    result
}
