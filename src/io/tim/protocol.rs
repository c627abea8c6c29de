//! CoLa-A scan telegram decoding.
//!
//! Telegram content is ASCII, space-delimited. A scan telegram carries the
//! `LMDscandata` type marker and a `DIST1` distance block:
//!
//! ```text
//! ... LMDscandata ... DIST1 <scale> <offset> <start> <step> <count> <count hex ranges> [RSSI1 ...]
//! ```
//!
//! - scale: IEEE-754 f32 bit pattern in hex (`3F800000` = 1.0)
//! - offset: skipped
//! - start: signed 32-bit hex, 1/10000 degree
//! - step: hex, 1/10000 degree
//! - count: hex sample count
//! - ranges: hex millimetres, scaled by the scale factor
//!
//! A trailing `RSSI1` reflectance block is recognized and skipped. Telegrams
//! whose geometry header is absent or mangled fall back to the configured
//! nominal device geometry instead of being dropped.

use crate::config::DeviceConfig;
use crate::core::types::{RawScan, ScanGeometry};
use crate::error::{Error, Result};

/// Scan data type marker.
const SCAN_MARKER: &str = "LMDscandata";
/// Distance block marker.
const DIST_MARKER: &str = "DIST1";
/// Reflectance block marker; terminates the sample run early.
const RSSI_MARKER: &str = "RSSI1";

/// Decoded geometry header of a `DIST1` block.
struct DistHeader {
    scale: f32,
    start_deg: f32,
    step_deg: f32,
    count: usize,
}

fn parse_header(tokens: &[&str], dist_idx: usize) -> Option<DistHeader> {
    let field = |offset: usize| tokens.get(dist_idx + offset).copied();

    let scale_bits = u32::from_str_radix(field(1)?, 16).ok()?;
    let scale = f32::from_bits(scale_bits);
    // field(2) is the scale offset; unused by this device family
    field(2)?;
    let start_raw = u32::from_str_radix(field(3)?, 16).ok()? as i32;
    let step_raw = u32::from_str_radix(field(4)?, 16).ok()?;
    // the count field is 16-bit on the wire; wider values mean a mangled header
    let count = u16::from_str_radix(field(5)?, 16).ok()? as usize;

    if !scale.is_finite() || scale <= 0.0 {
        return None;
    }

    Some(DistHeader {
        scale,
        start_deg: start_raw as f32 / 10_000.0,
        step_deg: step_raw as f32 / 10_000.0,
        count,
    })
}

/// Decode one framed telegram payload into a [`RawScan`].
///
/// Returns [`Error::NotAScan`] when either marker token is missing, so the
/// caller can drop non-scan telegrams (device replies, status telegrams)
/// without logging noise.
pub fn decode_scan(frame: &[u8], device: &DeviceConfig) -> Result<RawScan> {
    let text = String::from_utf8_lossy(frame);
    let tokens: Vec<&str> = text.split_whitespace().collect();

    if !tokens.iter().any(|&t| t == SCAN_MARKER) {
        return Err(Error::NotAScan);
    }
    let dist_idx = tokens
        .iter()
        .position(|&t| t == DIST_MARKER)
        .ok_or(Error::NotAScan)?;

    let (geometry, scale, samples_start) = match parse_header(&tokens, dist_idx)
        .and_then(|h| ScanGeometry::new(h.start_deg, h.step_deg, h.count).ok().map(|g| (g, h.scale)))
    {
        Some((geometry, scale)) => (geometry, scale, dist_idx + 6),
        None => {
            // Geometry fields absent or mangled: fall back to the documented
            // nominal layout and take every remaining token as a sample.
            let available = tokens[dist_idx + 1..]
                .iter()
                .take_while(|&&t| t != RSSI_MARKER)
                .count();
            if available == 0 {
                return Err(Error::InvalidTelegram(
                    "distance block carries no samples".to_string(),
                ));
            }
            log::warn!("scan telegram missing geometry header, using nominal geometry");
            let geometry = ScanGeometry::new(
                device.nominal_start_deg,
                device.nominal_step_deg,
                available,
            )?;
            (geometry, 1.0, dist_idx + 1)
        }
    };

    let declared = geometry.sample_count;
    let mut samples = Vec::with_capacity(declared);
    for &token in tokens
        .iter()
        .skip(samples_start)
        .take(declared)
        .take_while(|&&t| t != RSSI_MARKER)
    {
        samples.push(decode_sample(token, scale, device));
    }

    let short_frame = samples.len() < declared;
    if short_frame {
        log::warn!(
            "short scan telegram: {} of {} declared samples present",
            samples.len(),
            declared
        );
        samples.resize(declared, None);
    }

    Ok(RawScan {
        geometry,
        samples,
        short_frame,
    })
}

/// Decode one range token to millimetres.
///
/// Invalid when the token fails hex parse, the raw value is 0, or the scaled
/// value falls outside the device's valid window.
fn decode_sample(token: &str, scale: f32, device: &DeviceConfig) -> Option<u32> {
    let raw = u32::from_str_radix(token, 16).ok()?;
    if raw == 0 {
        return None;
    }
    let mm = (raw as f32 * scale).round() as u32;
    if mm < device.min_valid_mm || mm > device.max_valid_mm {
        return None;
    }
    Some(mm)
}
